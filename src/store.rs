//! Reactive wrapper around [`FormState`].
//!
//! Every edit is a typed [`Action`]. `dispatch` applies it together with the
//! couplings between fields (size and levels, norm type and weight power,
//! coordinate-uniform evaluation and construction methods, dimension and
//! every bound collection), then hands the derived [`FormView`] to the
//! subscribers.

use crate::{
    array_field::ArrayField,
    backend::Backend,
    construction::{ConstructionMethod, RequiredFields, format_number},
    error::{FormError, LatwebError},
    figure::{DEFAULT_NORM_TYPE, FigureKind, norm_is_two},
    form_state::{FormState, WeightPower},
    multilevel::{Combiner, NormalizationKind},
    weights::{WeightArray, WeightKind, WeightSpec},
};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetSize(String),
    SetDimension(String),
    SetNormType(String),
    SetCoordUniform(bool),
    SetFigure(FigureKind),
    SetAlpha(String),
    SetWeightPower(String),
    AddWeights(WeightKind),
    RemoveWeights(usize),
    SetWeightValue {
        position: usize,
        array: WeightArray,
        index: usize,
        raw: String,
    },
    SetWeightValues {
        position: usize,
        array: WeightArray,
        values: Vec<String>,
    },
    FillWeightValues {
        position: usize,
        array: WeightArray,
        values: Vec<f64>,
    },
    SetProjectionText {
        position: usize,
        text: String,
    },
    SetConstruction(ConstructionMethod),
    SetRandomSamples(String),
    SetGeneratorComponent {
        index: usize,
        raw: String,
    },
    SetGeneratingVector(Vec<String>),
    /// Values from an expression; reduced modulo the lattice size.
    FillGeneratingVector(Vec<f64>),
    CopyGeneratorFromResult(Vec<u64>),
    SetEmbedded(bool),
    SetNormalizationActive(bool),
    SetNormalizationKind(NormalizationKind),
    SetMinLevel(String),
    SetMaxLevel(String),
    SetLowPassActive(bool),
    SetLowPassThreshold(String),
    SetCombiner(Combiner),
    Reset,
}

/// Collection an expression can be evaluated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    GeneratingVector,
    Weights { position: usize, array: WeightArray },
}

impl FillTarget {
    pub fn index_variable(self) -> &'static str {
        match self {
            Self::GeneratingVector => WeightArray::Coordinate.index_variable(),
            Self::Weights { array, .. } => array.index_variable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightView {
    pub position: usize,
    pub kind: WeightKind,
    pub title: &'static str,
    pub formula: &'static str,
    pub fragment: String,
}

/// Everything a view needs to render the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub alpha_visible: bool,
    pub alpha_hint: Option<&'static str>,
    pub coord_uniform_available: bool,
    pub coord_uniform: bool,
    pub method: ConstructionMethod,
    pub selectable_methods: Vec<ConstructionMethod>,
    pub visible_construction_fields: RequiredFields,
    pub random_samples_label: Option<&'static str>,
    pub size_expansion: Option<String>,
    pub collection_labels: Vec<usize>,
    pub weights: Vec<WeightView>,
    pub weight_power: String,
    pub multilevel_panel_visible: bool,
    pub invalid_fields: Vec<String>,
    pub submittable: bool,
}

impl FormView {
    pub fn of(state: &FormState) -> Self {
        let figure = state.figure();
        let construction = state.construction();
        Self {
            alpha_visible: figure.alpha_visible(),
            alpha_hint: figure.kind().alpha_hint(),
            coord_uniform_available: figure.kind().supports_coord_uniform(),
            coord_uniform: state.coord_uniform(),
            method: construction.method(),
            selectable_methods: ConstructionMethod::ALL
                .into_iter()
                .filter(|m| m.is_available(state.coord_uniform()))
                .collect(),
            visible_construction_fields: construction.required_fields(),
            random_samples_label: construction.method().random_samples_label(),
            size_expansion: state.lattice_size().and_then(|s| s.expansion_label()),
            collection_labels: construction.generating_vector().labels(),
            weights: state
                .weights()
                .iter()
                .enumerate()
                .map(|(position, spec)| WeightView {
                    position,
                    kind: spec.kind(),
                    title: spec.kind().title(),
                    formula: spec.kind().formula(),
                    fragment: spec.fragment(),
                })
                .collect(),
            weight_power: state.weight_power().display_text(),
            multilevel_panel_visible: state.multilevel().embedded(),
            invalid_fields: state.invalid_fields(),
            submittable: state.check_submittable().is_ok(),
        }
    }
}

type Subscriber = Box<dyn Fn(&FormView) + Send>;

#[derive(Default)]
pub struct FormStore {
    state: FormState,
    subscribers: Vec<Subscriber>,
}

impl FormStore {
    pub fn new(state: FormState) -> Self {
        Self {
            state,
            subscribers: vec![],
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn into_state(self) -> FormState {
        self.state
    }

    pub fn view(&self) -> FormView {
        FormView::of(&self.state)
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&FormView) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Applies `action`. A rejected action leaves the state untouched and
    /// notifies nobody, except an out-of-range dimension: its text is kept
    /// so the field shows as invalid, while the collections keep their length.
    pub fn dispatch(&mut self, action: Action) -> Result<(), FormError> {
        debug!(?action, "dispatch");
        match apply(&mut self.state, action) {
            Ok(()) => {
                self.notify();
                Ok(())
            }
            Err(err @ FormError::InvalidDimension(_)) => {
                self.notify();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let view = self.view();
        for subscriber in &self.subscribers {
            subscriber(&view);
        }
    }

    /// Evaluates `expr` on the backend and fills `target` with the values.
    /// Nothing changes when the backend call fails.
    pub fn fill_from_expression(
        &mut self,
        backend: &dyn Backend,
        target: FillTarget,
        expr: &str,
    ) -> Result<(), LatwebError> {
        if let FillTarget::Weights { position, array } = target {
            let spec = self
                .state
                .weights
                .get(position)
                .ok_or(FormError::UnknownWeights(position))?;
            if spec.array(array).is_none() {
                return Err(FormError::NoSuchArray {
                    kind: spec.kind().id().to_string(),
                    array: array.id().to_string(),
                }
                .into());
            }
        }
        let length = self.state.bound_dimension();
        let values = backend.array_from_expr(expr, target.index_variable(), length)?;
        info!(expr, count = values.len(), "filled values from expression");
        let action = match target {
            FillTarget::GeneratingVector => Action::FillGeneratingVector(values),
            FillTarget::Weights { position, array } => Action::FillWeightValues {
                position,
                array,
                values,
            },
        };
        self.dispatch(action)?;
        Ok(())
    }
}

fn apply(state: &mut FormState, action: Action) -> Result<(), FormError> {
    match action {
        Action::SetSize(raw) => {
            state.size.set(raw);
            let exponent = state.size_exponent();
            state.multilevel.on_size_exponent(exponent);
        }
        Action::SetDimension(raw) => {
            state.dimension.set(raw);
            match state.dimension_value() {
                Some(dimension) if dimension != state.bound_dimension() => {
                    state.resize_bound(dimension);
                }
                Some(_) => {}
                None if state.dimension.is_valid() && !state.dimension.is_blank() => {
                    return Err(FormError::InvalidDimension(
                        state.dimension.trimmed().to_string(),
                    ));
                }
                None => {}
            }
        }
        Action::SetNormType(raw) => set_norm_type(state, raw),
        Action::SetCoordUniform(on) => set_coord_uniform(state, on)?,
        Action::SetFigure(kind) => {
            state.figure.set_kind(kind);
            if !kind.supports_coord_uniform() {
                set_coord_uniform(state, false)?;
            }
        }
        Action::SetAlpha(raw) => {
            state.figure.set_alpha(raw);
            state.figure.adjust_alpha();
        }
        Action::SetWeightPower(raw) => state.weight_power = WeightPower::from_input(&raw),
        Action::AddWeights(kind) => {
            let spec = WeightSpec::new(kind, state.bound_dimension());
            info!(kind = %kind, position = state.weights.len(), "added weights");
            state.weights.push(spec);
        }
        Action::RemoveWeights(position) => {
            if position >= state.weights.len() {
                return Err(FormError::UnknownWeights(position));
            }
            let spec = state.weights.remove(position);
            info!(kind = %spec.kind(), position, "removed weights");
        }
        Action::SetWeightValue {
            position,
            array,
            index,
            raw,
        } => {
            let field = weights_array(state, position, array)?;
            let len = field.len();
            field
                .set(index, raw)
                .ok_or(FormError::IndexOutOfRange { index, len })?;
        }
        Action::SetWeightValues {
            position,
            array,
            values,
        } => {
            let dimension = state.bound_dimension();
            let field = weights_array(state, position, array)?;
            field.set_values(&values);
            field.resize(dimension);
        }
        Action::FillWeightValues {
            position,
            array,
            values,
        } => {
            let dimension = state.bound_dimension();
            let field = weights_array(state, position, array)?;
            let text: Vec<String> = values
                .iter()
                .map(|v| format_number(*v))
                .collect();
            field.set_values(&text);
            field.resize(dimension);
        }
        Action::SetProjectionText { position, text } => {
            state
                .weights
                .get_mut(position)
                .ok_or(FormError::UnknownWeights(position))?
                .set_text(text)?;
        }
        Action::SetConstruction(method) => state.construction.select(method, state.coord_uniform)?,
        Action::SetRandomSamples(raw) => {
            state.construction.set_random_samples(raw);
        }
        Action::SetGeneratorComponent { index, raw } => {
            state.construction.set_generator_component(index, raw)?;
        }
        Action::SetGeneratingVector(values) => {
            let dimension = state.bound_dimension();
            state.construction.set_generating_vector(&values);
            state.construction.resize(dimension);
        }
        Action::FillGeneratingVector(values) => {
            let dimension = state.bound_dimension();
            let modulus = state.lattice_size().and_then(|s| s.points());
            state.construction.fill_generating_vector(&values, modulus);
            state.construction.resize(dimension);
        }
        Action::CopyGeneratorFromResult(generator) => state.construction.copy_generator(&generator),
        Action::SetEmbedded(on) => state.multilevel.set_embedded(on),
        Action::SetNormalizationActive(on) => state.multilevel.set_normalization_active(on),
        Action::SetNormalizationKind(kind) => state.multilevel.set_normalization(kind),
        Action::SetMinLevel(raw) => {
            let exponent = state.size_exponent();
            state.multilevel.set_min_level(raw, exponent);
        }
        Action::SetMaxLevel(raw) => {
            let exponent = state.size_exponent();
            state.multilevel.set_max_level(raw, exponent);
        }
        Action::SetLowPassActive(on) => state.multilevel.set_low_pass_active(on),
        Action::SetLowPassThreshold(raw) => {
            state.multilevel.set_low_pass_threshold(raw);
        }
        Action::SetCombiner(combiner) => state.multilevel.set_combiner(combiner),
        Action::Reset => *state = FormState::default(),
    }
    Ok(())
}

fn weights_array(
    state: &mut FormState,
    position: usize,
    array: WeightArray,
) -> Result<&mut ArrayField, FormError> {
    state
        .weights
        .get_mut(position)
        .ok_or(FormError::UnknownWeights(position))?
        .array_mut(array)
}

fn set_norm_type(state: &mut FormState, raw: String) {
    state.norm_type.set(raw);
    if !state.norm_type.is_valid() || state.norm_type.is_blank() {
        return;
    }
    let norm = state.norm_type.trimmed().to_string();
    state.weight_power.on_norm_type(&norm);
    if state.coord_uniform && !norm_is_two(&norm) {
        info!(norm = %norm, "norm type is not 2; coordinate-uniform evaluation disabled");
        disable_coord_uniform(state);
    }
}

fn set_coord_uniform(state: &mut FormState, on: bool) -> Result<(), FormError> {
    if !on {
        disable_coord_uniform(state);
        return Ok(());
    }
    let kind = state.figure.kind();
    if !kind.supports_coord_uniform() {
        return Err(FormError::CoordUniformUnavailable(kind.id().to_string()));
    }
    state.coord_uniform = true;
    if !norm_is_two(state.norm_type.raw()) {
        set_norm_type(state, DEFAULT_NORM_TYPE.to_string());
    }
    Ok(())
}

fn disable_coord_uniform(state: &mut FormState) {
    state.coord_uniform = false;
    if state.construction.enforce_capabilities(false) {
        info!(
            method = %ConstructionMethod::FALLBACK,
            "construction method needs coordinate-uniform evaluation; switched"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use latweb_protocol::ExecResult;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    struct FixedBackend(Result<Vec<f64>, BackendError>);

    impl Backend for FixedBackend {
        fn backend_version(&self) -> Result<String, BackendError> {
            Ok("test".to_string())
        }

        fn array_from_expr(&self, _: &str, _: &str, _: usize) -> Result<Vec<f64>, BackendError> {
            self.0.clone()
        }

        fn latbuilder_exec(&self, _: &[Value]) -> Result<ExecResult, BackendError> {
            Err(BackendError::Transport("not used".to_string()))
        }
    }

    fn lengths(state: &FormState) -> Vec<usize> {
        let mut out = vec![state.construction().generating_vector().len()];
        for spec in state.weights() {
            for which in spec.kind().arrays() {
                out.push(spec.array(*which).unwrap().len());
            }
        }
        out
    }

    #[test]
    fn dimension_resizes_every_collection() {
        let mut store = FormStore::default();
        store.dispatch(Action::AddWeights(WeightKind::Pod)).unwrap();
        store.dispatch(Action::SetDimension("5".into())).unwrap();
        assert_eq!(lengths(store.state()), vec![5, 5, 5, 5]);
        store.dispatch(Action::AddWeights(WeightKind::OrderDependent)).unwrap();
        assert_eq!(lengths(store.state()), vec![5, 5, 5, 5, 5]);
    }

    #[test]
    fn invalid_dimension_keeps_lengths() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetDimension("x".into())).unwrap();
        assert_eq!(lengths(store.state()), vec![3, 3]);
        assert!(store.view().invalid_fields.contains(&"dimension".to_string()));
    }

    #[test]
    fn oversized_dimension_is_rejected() {
        let mut store = FormStore::default();
        let notified = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&notified);
        store.subscribe(move |_| *sink.lock().unwrap() += 1);
        let huge = "1152921504606846976";
        assert!(crate::validator::validate(crate::validator::Pattern::Integer, huge));
        assert_eq!(
            store.dispatch(Action::SetDimension(huge.into())),
            Err(FormError::InvalidDimension(huge.to_string()))
        );
        assert_eq!(lengths(store.state()), vec![3, 3]);
        assert_eq!(store.view().invalid_fields, vec!["dimension"]);
        assert!(!store.view().submittable);
        assert_eq!(*notified.lock().unwrap(), 1);

        store.dispatch(Action::SetDimension("4".into())).unwrap();
        assert_eq!(lengths(store.state()), vec![4, 4]);
        assert!(store.view().submittable);
    }

    #[test]
    fn value_lists_follow_the_dimension() {
        let mut store = FormStore::default();
        store
            .dispatch(Action::SetWeightValues {
                position: 0,
                array: WeightArray::Coordinate,
                values: vec!["0.9".into()],
            })
            .unwrap();
        assert_eq!(
            store.state().weights()[0]
                .array(WeightArray::Coordinate)
                .unwrap()
                .values(),
            vec!["0.9", "0.9", "0.9"]
        );
        store
            .dispatch(Action::SetWeightValues {
                position: 0,
                array: WeightArray::Coordinate,
                values: vec!["0.5".into(), "0.4".into(), "0.3".into(), "0.2".into()],
            })
            .unwrap();
        assert_eq!(lengths(store.state()), vec![3, 3]);

        store
            .dispatch(Action::SetGeneratingVector(vec!["1".into(), "5".into()]))
            .unwrap();
        assert_eq!(
            store.state().construction().generating_vector().values(),
            vec!["1", "5", "5"]
        );
        store
            .dispatch(Action::SetGeneratingVector(
                ["1", "3", "5", "7", "9"].map(String::from).to_vec(),
            ))
            .unwrap();
        assert_eq!(
            store.state().construction().generating_vector().values(),
            vec!["1", "3", "5"]
        );
    }

    #[test]
    fn resize_keeps_prefix() {
        let mut store = FormStore::default();
        store
            .dispatch(Action::SetWeightValues {
                position: 0,
                array: WeightArray::Coordinate,
                values: vec!["0.9".into(), "0.8".into(), "0.7".into()],
            })
            .unwrap();
        store.dispatch(Action::SetDimension("5".into())).unwrap();
        store.dispatch(Action::SetDimension("3".into())).unwrap();
        let values = store.state().weights()[0]
            .array(WeightArray::Coordinate)
            .unwrap()
            .values();
        assert_eq!(values, vec!["0.9", "0.8", "0.7"]);
    }

    #[test]
    fn size_exponent_drives_levels() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetSize("2^8".into())).unwrap();
        assert_eq!(store.state().multilevel().max_level().raw(), "8");
        store.dispatch(Action::SetMinLevel("9".into())).unwrap();
        assert_eq!(store.state().multilevel().min_level().raw(), "8");
        store.dispatch(Action::SetSize("2^5".into())).unwrap();
        assert_eq!(store.state().multilevel().max_level().raw(), "5");
        assert_eq!(store.state().multilevel().min_level().raw(), "5");
        assert_eq!(store.view().size_expansion.as_deref(), Some(" = 32"));
    }

    #[test]
    fn norm_type_drives_weight_power_and_cu() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetCoordUniform(true)).unwrap();
        store.dispatch(Action::SetConstruction(ConstructionMethod::FastCbc)).unwrap();
        store.dispatch(Action::SetNormType("inf".into())).unwrap();
        let state = store.state();
        assert_eq!(state.weight_power().resolve("inf"), "1");
        assert!(!state.coord_uniform());
        assert_eq!(state.construction().method(), ConstructionMethod::Cbc);
    }

    #[test]
    fn enabling_cu_forces_norm_two() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetNormType("1".into())).unwrap();
        store.dispatch(Action::SetCoordUniform(true)).unwrap();
        assert_eq!(store.state().norm_type().raw(), "2");
        assert_eq!(store.state().weight_power().resolve("2"), "2");
    }

    #[test]
    fn cu_methods_need_cu() {
        let mut store = FormStore::default();
        let before = store.state().clone();
        let err = store
            .dispatch(Action::SetConstruction(ConstructionMethod::FastCbc))
            .unwrap_err();
        assert!(matches!(err, FormError::MethodNotSelectable { .. }));
        assert_eq!(store.state(), &before);
        assert!(!store.view().selectable_methods.contains(&ConstructionMethod::FastCbc));
    }

    #[test]
    fn spectral_drops_cu_and_hides_alpha() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetCoordUniform(true)).unwrap();
        store.dispatch(Action::SetConstruction(ConstructionMethod::FastCbc)).unwrap();
        store.dispatch(Action::SetFigure(FigureKind::Spectral)).unwrap();
        let view = store.view();
        assert!(!view.alpha_visible);
        assert!(!view.coord_uniform_available);
        assert!(!view.coord_uniform);
        assert_eq!(view.method, ConstructionMethod::Cbc);
        assert!(matches!(
            store.dispatch(Action::SetCoordUniform(true)),
            Err(FormError::CoordUniformUnavailable(_))
        ));
    }

    #[test]
    fn removing_unknown_weights_fails() {
        let mut store = FormStore::default();
        assert_eq!(
            store.dispatch(Action::RemoveWeights(3)),
            Err(FormError::UnknownWeights(3))
        );
        store.dispatch(Action::RemoveWeights(0)).unwrap();
        assert!(!store.view().submittable);
    }

    #[test]
    fn subscribers_see_each_transition() {
        let seen = Arc::new(Mutex::new(vec![]));
        let mut store = FormStore::default();
        let sink = Arc::clone(&seen);
        store.subscribe(move |view| sink.lock().unwrap().push(view.weights.len()));
        store.dispatch(Action::AddWeights(WeightKind::Product)).unwrap();
        let _ = store.dispatch(Action::RemoveWeights(9));
        store.dispatch(Action::RemoveWeights(0)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn fill_generating_vector_reduces_modulo_size() {
        let mut store = FormStore::default();
        let backend = FixedBackend(Ok(vec![1.0, 1025.0, 3000.0]));
        store
            .fill_from_expression(&backend, FillTarget::GeneratingVector, "1+1024*j")
            .unwrap();
        assert_eq!(
            store.state().construction().generating_vector().values(),
            vec!["1", "1", "952"]
        );
    }

    #[test]
    fn failed_fill_changes_nothing() {
        let mut store = FormStore::default();
        let before = store.state().clone();
        let backend = FixedBackend(Err(BackendError::Remote {
            message: "syntax error".to_string(),
        }));
        let target = FillTarget::Weights {
            position: 0,
            array: WeightArray::Coordinate,
        };
        assert!(store.fill_from_expression(&backend, target, "1/j^").is_err());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn fill_weights_from_expression() {
        let mut store = FormStore::default();
        let backend = FixedBackend(Ok(vec![1.0, 0.5, 0.25]));
        let target = FillTarget::Weights {
            position: 0,
            array: WeightArray::Coordinate,
        };
        store.fill_from_expression(&backend, target, "2^(1-j)").unwrap();
        assert_eq!(
            store.state().weights()[0].fragment(),
            "product:0.25:1,0.5,0.25"
        );
    }

    #[test]
    fn copy_generator_from_result() {
        let mut store = FormStore::default();
        store
            .dispatch(Action::CopyGeneratorFromResult(vec![1, 433, 229, 77]))
            .unwrap();
        assert_eq!(
            store.state().construction().generating_vector().values(),
            vec!["1", "433", "229"]
        );
    }
}
