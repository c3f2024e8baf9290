//! Assembly of the positional parameter list of `latbuilder_exec`.

use crate::{error::SubmitError, form_state::FormState};
use latweb_protocol::EXEC_PARAM_COUNT;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const LATTICE_EMBEDDED: &str = "embedded";
pub const LATTICE_ORDINARY: &str = "ordinary";

/// A validated search request, one field per positional slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub lattice_type: String,
    pub size: String,
    pub dimension: String,
    pub norm_type: String,
    pub figure: String,
    pub construction: String,
    pub weights: Vec<String>,
    pub weight_power: String,
    /// Always empty; the slot is kept for arity.
    pub reserved: String,
    pub filters: Vec<String>,
    pub combiner: String,
}

impl SearchRequest {
    pub fn to_params(&self) -> Vec<Value> {
        let params = vec![
            json!(self.lattice_type),
            json!(self.size),
            json!(self.dimension),
            json!(self.norm_type),
            json!(self.figure),
            json!(self.construction),
            json!(self.weights),
            json!(self.weight_power),
            json!(self.reserved),
            json!(self.filters),
            json!(self.combiner),
        ];
        debug_assert_eq!(params.len(), EXEC_PARAM_COUNT);
        params
    }
}

pub fn build_request(state: &FormState) -> Result<SearchRequest, SubmitError> {
    state.check_submittable()?;
    let norm_type = state.norm_type().trimmed().to_string();
    let multilevel = state.multilevel();
    let lattice_type = if multilevel.embedded() {
        LATTICE_EMBEDDED
    } else {
        LATTICE_ORDINARY
    };
    Ok(SearchRequest {
        lattice_type: lattice_type.to_string(),
        size: state.size().trimmed().to_string(),
        dimension: state.dimension().trimmed().to_string(),
        figure: state.figure().render(&norm_type, state.coord_uniform()),
        construction: state.construction().build_arg(),
        weights: state.weights().iter().map(|w| w.fragment()).collect(),
        weight_power: state.weight_power().resolve(&norm_type),
        reserved: String::new(),
        filters: multilevel.filters(state.figure().alpha().trimmed()),
        combiner: multilevel.combiner_arg(),
        norm_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        construction::ConstructionMethod,
        figure::FigureKind,
        multilevel::Combiner,
        store::{Action, FormStore},
        weights::{WeightArray, WeightKind},
    };

    #[test]
    fn default_form_request() {
        let request = build_request(&FormState::default()).unwrap();
        assert_eq!(
            Value::Array(request.to_params()),
            json!([
                "ordinary",
                "2^10",
                "3",
                "2",
                "P2",
                "CBC",
                ["product:0.1:0.1,0.1,0.1"],
                "2",
                "",
                [],
                ""
            ])
        );
    }

    #[test]
    fn full_request() {
        let mut store = FormStore::default();
        for action in [
            Action::SetDimension("2".into()),
            Action::SetCoordUniform(true),
            Action::SetConstruction(ConstructionMethod::RandomCbc),
            Action::SetRandomSamples("30".into()),
            Action::SetWeightValues {
                position: 0,
                array: WeightArray::Coordinate,
                values: vec!["0.7".into(), "0.3".into()],
            },
            Action::AddWeights(WeightKind::ProjectionDependent),
            Action::SetProjectionText {
                position: 1,
                text: "1,2: 0.5".into(),
            },
            Action::SetWeightPower("q".into()),
            Action::SetEmbedded(true),
            Action::SetNormalizationActive(true),
            Action::SetLowPassActive(true),
            Action::SetCombiner(Combiner::Level(3)),
        ] {
            store.dispatch(action).unwrap();
        }
        let params = build_request(store.state()).unwrap().to_params();
        assert_eq!(params.len(), EXEC_PARAM_COUNT);
        assert_eq!(
            Value::Array(params),
            json!([
                "embedded",
                "2^10",
                "2",
                "2",
                "CU:P2",
                "random-CBC:30",
                ["product:0.3:0.7,0.3", "projection-dependent:1,2:0.5"],
                "2",
                "",
                ["norm:P2-SL10:even:1,10", "low-pass:1.0"],
                "level:3"
            ])
        );
    }

    #[test]
    fn padded_alpha_is_trimmed_everywhere() {
        let mut store = FormStore::default();
        for action in [
            Action::SetFigure(FigureKind::RAlpha),
            Action::SetAlpha(" 1.5 ".into()),
            Action::SetEmbedded(true),
            Action::SetNormalizationActive(true),
        ] {
            store.dispatch(action).unwrap();
        }
        let request = build_request(store.state()).unwrap();
        assert_eq!(request.figure, "R1.5");
        assert_eq!(request.filters, vec!["norm:P1.5-SL10:even:1,10"]);
    }

    #[test]
    fn zero_weights_build_nothing() {
        let mut store = FormStore::default();
        store.dispatch(Action::RemoveWeights(0)).unwrap();
        assert_eq!(build_request(store.state()), Err(SubmitError::NoWeights));
    }

    #[test]
    fn invalid_inputs_build_nothing() {
        let mut store = FormStore::default();
        store.dispatch(Action::SetAlpha("two".into())).unwrap();
        assert_eq!(
            build_request(store.state()),
            Err(SubmitError::InvalidFields(vec!["alpha".to_string()]))
        );
    }
}
