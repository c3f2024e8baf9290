//! The complete, serializable state of a construction form.

use crate::{
    construction::ConstructionSpec,
    error::{LatwebError, SubmitError},
    figure::{DEFAULT_NORM_TYPE, FigureSpec, weight_power_for_norm},
    multilevel::MultilevelSpec,
    size_param::LatticeSize,
    validator::{Pattern, ScalarField},
    weights::{WeightKind, WeightSpec},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_SIZE: &str = "2^10";
pub const DEFAULT_DIMENSION: &str = "3";
/// Largest dimension the form accepts.
pub const MAX_DIMENSION: usize = 10_000;

/// Weight power sent with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum WeightPower {
    /// Entered as `q`; resolves to the norm type when the request is built.
    FollowNormType,
    Explicit { value: ScalarField },
}

impl Default for WeightPower {
    fn default() -> Self {
        Self::explicit(DEFAULT_NORM_TYPE)
    }
}

impl WeightPower {
    pub fn explicit(raw: impl Into<String>) -> Self {
        Self::Explicit {
            value: ScalarField::new(Pattern::RealNonneg, raw),
        }
    }

    /// Interprets user input: `q` or `Q` selects the norm-following rule.
    pub fn from_input(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("q") {
            Self::FollowNormType
        } else {
            Self::explicit(raw)
        }
    }

    pub fn resolve(&self, norm_type: &str) -> String {
        match self {
            Self::FollowNormType => norm_type.trim().to_string(),
            Self::Explicit { value } => value.raw().to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::FollowNormType => true,
            Self::Explicit { value } => value.is_valid(),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::FollowNormType => "q".to_string(),
            Self::Explicit { value } => value.raw().to_string(),
        }
    }

    /// An explicit power follows norm type changes; the named rule already
    /// does.
    pub(crate) fn on_norm_type(&mut self, norm_type: &str) {
        if let Self::Explicit { value } = self {
            value.set(weight_power_for_norm(norm_type));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub(crate) size: ScalarField,
    pub(crate) dimension: ScalarField,
    pub(crate) norm_type: ScalarField,
    pub(crate) coord_uniform: bool,
    pub(crate) figure: FigureSpec,
    pub(crate) construction: ConstructionSpec,
    pub(crate) weights: Vec<WeightSpec>,
    pub(crate) weight_power: WeightPower,
    pub(crate) multilevel: MultilevelSpec,
}

impl Default for FormState {
    fn default() -> Self {
        let dimension = 3;
        let size = ScalarField::new(Pattern::Size, DEFAULT_SIZE);
        let mut multilevel = MultilevelSpec::default();
        multilevel.on_size_exponent(size.parse::<LatticeSize>().and_then(|s| s.exponent()));
        Self {
            size,
            dimension: ScalarField::new(Pattern::Integer, DEFAULT_DIMENSION),
            norm_type: ScalarField::new(Pattern::NormToken, DEFAULT_NORM_TYPE),
            coord_uniform: false,
            figure: FigureSpec::default(),
            construction: ConstructionSpec::new(dimension),
            weights: vec![WeightSpec::new(WeightKind::Product, dimension)],
            weight_power: WeightPower::default(),
            multilevel,
        }
    }
}

impl FormState {
    pub fn size(&self) -> &ScalarField {
        &self.size
    }

    pub fn dimension(&self) -> &ScalarField {
        &self.dimension
    }

    pub fn norm_type(&self) -> &ScalarField {
        &self.norm_type
    }

    pub fn coord_uniform(&self) -> bool {
        self.coord_uniform
    }

    pub fn figure(&self) -> &FigureSpec {
        &self.figure
    }

    pub fn construction(&self) -> &ConstructionSpec {
        &self.construction
    }

    pub fn weights(&self) -> &[WeightSpec] {
        &self.weights
    }

    pub fn weight_power(&self) -> &WeightPower {
        &self.weight_power
    }

    pub fn multilevel(&self) -> &MultilevelSpec {
        &self.multilevel
    }

    /// The dimension, when the raw text is an integer in
    /// `1..=MAX_DIMENSION`.
    pub fn dimension_value(&self) -> Option<usize> {
        if !self.dimension.is_valid() {
            return None;
        }
        self.dimension
            .parse::<usize>()
            .filter(|d| (1..=MAX_DIMENSION).contains(d))
    }

    /// Blank counts as valid, like every other input.
    pub fn dimension_is_valid(&self) -> bool {
        self.dimension.is_blank() || self.dimension_value().is_some()
    }

    /// Length shared by every bound collection. Lags behind the dimension
    /// text while that text is invalid.
    pub fn bound_dimension(&self) -> usize {
        self.construction.generating_vector().len()
    }

    pub fn lattice_size(&self) -> Option<LatticeSize> {
        if !self.size.is_valid() {
            return None;
        }
        self.size.parse::<LatticeSize>()
    }

    pub fn size_exponent(&self) -> Option<u32> {
        self.lattice_size().and_then(|s| s.exponent())
    }

    pub fn invalid_fields(&self) -> Vec<String> {
        let mut out = vec![];
        if !self.size.is_valid() {
            out.push("size".to_string());
        }
        if !self.dimension_is_valid() {
            out.push("dimension".to_string());
        }
        if !self.norm_type.is_valid() {
            out.push("norm-type".to_string());
        }
        if self.figure.alpha_visible() && !self.figure.alpha().is_valid() {
            out.push("alpha".to_string());
        }
        if !self.weight_power.is_valid() {
            out.push("weights-power".to_string());
        }
        for (i, spec) in self.weights.iter().enumerate() {
            out.extend(spec.invalid_fields(i + 1));
        }
        out.extend(self.construction.invalid_fields());
        out.extend(self.multilevel.invalid_fields());
        out
    }

    /// Gate run before any request is built.
    pub fn check_submittable(&self) -> Result<(), SubmitError> {
        let invalid = self.invalid_fields();
        if !invalid.is_empty() {
            return Err(SubmitError::InvalidFields(invalid));
        }
        if self.weights.is_empty() {
            return Err(SubmitError::NoWeights);
        }
        Ok(())
    }

    /// Sets every bound collection to `dimension` entries.
    pub(crate) fn resize_bound(&mut self, dimension: usize) {
        debug!(dimension, "resizing bound collections");
        self.construction.resize(dimension);
        for spec in &mut self.weights {
            spec.resize(dimension);
        }
    }

    /// Reads a state file. Bound collections are brought back to a common
    /// length: the dimension when it is usable, else the generating vector's.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, LatwebError> {
        let text = std::fs::read_to_string(path)?;
        let mut state: Self = serde_json::from_str(&text)?;
        let dimension = state
            .dimension_value()
            .unwrap_or_else(|| state.bound_dimension());
        state.resize_bound(dimension);
        Ok(state)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), LatwebError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightArray;
    use tempfile::tempdir;

    #[test]
    fn default_form_is_submittable() {
        let state = FormState::default();
        assert_eq!(state.dimension_value(), Some(3));
        assert_eq!(state.bound_dimension(), 3);
        assert_eq!(state.size_exponent(), Some(10));
        assert_eq!(state.multilevel().max_level().raw(), "10");
        assert_eq!(state.weights().len(), 1);
        assert!(state.check_submittable().is_ok());
    }

    #[test]
    fn zero_weights_are_refused() {
        let mut state = FormState::default();
        state.weights.clear();
        assert_eq!(state.check_submittable(), Err(SubmitError::NoWeights));
    }

    #[test]
    fn invalid_fields_block_submission() {
        let mut state = FormState::default();
        state.dimension.set("0");
        state.norm_type.set("-1");
        match state.check_submittable() {
            Err(SubmitError::InvalidFields(names)) => {
                assert_eq!(names, vec!["dimension", "norm-type"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn weight_power_rule() {
        let power = WeightPower::from_input("Q");
        assert_eq!(power, WeightPower::FollowNormType);
        assert_eq!(power.resolve("inf"), "inf");
        let mut power = WeightPower::from_input("1.5");
        power.on_norm_type("inf");
        assert_eq!(power.resolve("inf"), "1");
        assert!(!WeightPower::from_input("-2").is_valid());
    }

    #[test]
    fn state_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("form.json");
        let mut state = FormState::default();
        state.weight_power = WeightPower::FollowNormType;
        state.save_to_path(&path).unwrap();
        let loaded = FormState::load_from_path(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn dimension_has_an_upper_bound() {
        let mut state = FormState::default();
        state.dimension.set("1152921504606846976");
        assert!(state.dimension().is_valid());
        assert_eq!(state.dimension_value(), None);
        assert_eq!(state.invalid_fields(), vec!["dimension"]);
        state.dimension.set(MAX_DIMENSION.to_string());
        assert_eq!(state.dimension_value(), Some(MAX_DIMENSION));
        state.dimension.set("");
        assert!(state.invalid_fields().is_empty());
    }

    #[test]
    fn loading_restores_bound_lengths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edited.json");
        let mut state = FormState::default();
        state.construction.resize(5);
        state.weights[0].resize(2);
        state.save_to_path(&path).unwrap();

        let loaded = FormState::load_from_path(&path).unwrap();
        assert_eq!(loaded.bound_dimension(), 3);
        assert_eq!(
            loaded.weights()[0]
                .array(WeightArray::Coordinate)
                .unwrap()
                .len(),
            3
        );
        assert!(loaded.check_submittable().is_ok());
    }

    #[test]
    fn loading_a_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = FormState::load_from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LatwebError::Io(_)));
    }
}
