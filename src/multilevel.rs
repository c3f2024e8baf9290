//! Options that only apply to embedded (multilevel) lattices: merit
//! normalization, low-pass filtering and the level combiner.

use crate::{
    error::FormError,
    validator::{Pattern, ScalarField},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_MIN_LEVEL: &str = "1";
pub const DEFAULT_LOW_PASS_THRESHOLD: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizationKind {
    #[serde(rename = "SL10")]
    Sl10,
    #[serde(rename = "DPW08")]
    Dpw08,
}

impl NormalizationKind {
    pub fn template(self) -> &'static str {
        match self {
            Self::Sl10 => "P{alpha}-SL10",
            Self::Dpw08 => "P{alpha}-DPW08",
        }
    }

    pub fn render(self, alpha: &str) -> String {
        self.template().replacen("{alpha}", alpha, 1)
    }
}

impl FromStr for NormalizationKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SL10" | "P{ALPHA}-SL10" => Ok(Self::Sl10),
            "DPW08" | "P{ALPHA}-DPW08" => Ok(Self::Dpw08),
            _ => Err(FormError::unknown("normalization", s.trim())),
        }
    }
}

/// How per-level merit values are combined into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Combiner {
    #[default]
    Sum,
    Max,
    LevelMax,
    Level(u32),
}

impl fmt::Display for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("sum"),
            Self::Max => f.write_str("max"),
            Self::LevelMax => f.write_str("level:max"),
            Self::Level(k) => write!(f, "level:{k}"),
        }
    }
}

impl FromStr for Combiner {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            "level:max" => Ok(Self::LevelMax),
            _ => s
                .strip_prefix("level:")
                .and_then(|k| k.parse::<u32>().ok())
                .filter(|k| *k > 0)
                .map(Self::Level)
                .ok_or_else(|| FormError::unknown("combiner", s)),
        }
    }
}

impl TryFrom<String> for Combiner {
    type Error = FormError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Combiner> for String {
    fn from(c: Combiner) -> Self {
        c.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultilevelSpec {
    embedded: bool,
    normalization_active: bool,
    normalization: NormalizationKind,
    min_level: ScalarField,
    max_level: ScalarField,
    low_pass_active: bool,
    low_pass_threshold: ScalarField,
    combiner: Combiner,
}

impl Default for MultilevelSpec {
    fn default() -> Self {
        Self {
            embedded: false,
            normalization_active: false,
            normalization: NormalizationKind::Sl10,
            min_level: ScalarField::new(Pattern::Integer, DEFAULT_MIN_LEVEL),
            max_level: ScalarField::new(Pattern::Integer, ""),
            low_pass_active: false,
            low_pass_threshold: ScalarField::new(Pattern::Real, DEFAULT_LOW_PASS_THRESHOLD),
            combiner: Combiner::Sum,
        }
    }
}

impl MultilevelSpec {
    pub fn embedded(&self) -> bool {
        self.embedded
    }

    pub fn set_embedded(&mut self, on: bool) {
        self.embedded = on;
    }

    pub fn normalization_active(&self) -> bool {
        self.normalization_active
    }

    pub fn set_normalization_active(&mut self, on: bool) {
        self.normalization_active = on;
    }

    pub fn normalization(&self) -> NormalizationKind {
        self.normalization
    }

    pub fn set_normalization(&mut self, kind: NormalizationKind) {
        self.normalization = kind;
    }

    pub fn low_pass_active(&self) -> bool {
        self.low_pass_active
    }

    pub fn set_low_pass_active(&mut self, on: bool) {
        self.low_pass_active = on;
    }

    pub fn low_pass_threshold(&self) -> &ScalarField {
        &self.low_pass_threshold
    }

    pub fn set_low_pass_threshold(&mut self, raw: impl Into<String>) -> bool {
        self.low_pass_threshold.set(raw)
    }

    pub fn combiner(&self) -> Combiner {
        self.combiner
    }

    pub fn set_combiner(&mut self, combiner: Combiner) {
        self.combiner = combiner;
    }

    pub fn min_level(&self) -> &ScalarField {
        &self.min_level
    }

    pub fn max_level(&self) -> &ScalarField {
        &self.max_level
    }

    /// Sets the minimum level, capped by the size exponent; the maximum is
    /// raised to stay at or above it.
    pub fn set_min_level(&mut self, raw: impl Into<String>, exponent: Option<u32>) {
        self.min_level.set(raw);
        let Some(mut level) = self.min_level.parse::<u32>() else {
            return;
        };
        if let Some(cap) = exponent.filter(|cap| level > *cap) {
            level = cap;
            self.min_level.set(level.to_string());
        }
        if self.max_level.parse::<u32>().is_none_or(|max| max < level) {
            self.max_level.set(level.to_string());
        }
    }

    /// Sets the maximum level, capped by the size exponent; the minimum is
    /// lowered to stay at or below it.
    pub fn set_max_level(&mut self, raw: impl Into<String>, exponent: Option<u32>) {
        self.max_level.set(raw);
        let Some(mut level) = self.max_level.parse::<u32>() else {
            return;
        };
        if let Some(cap) = exponent.filter(|cap| level > *cap) {
            level = cap;
            self.max_level.set(level.to_string());
        }
        if self.min_level.parse::<u32>().is_some_and(|min| min > level) {
            self.min_level.set(level.to_string());
        }
    }

    /// A size with an exponent sets the maximum level to that exponent.
    pub fn on_size_exponent(&mut self, exponent: Option<u32>) {
        if let Some(exp) = exponent {
            self.set_max_level(exp.to_string(), Some(exp));
        }
    }

    /// Multilevel filter fragments; empty unless the lattice is embedded.
    pub fn filters(&self, alpha: &str) -> Vec<String> {
        let mut out = vec![];
        if !self.embedded {
            return out;
        }
        if self.normalization_active {
            out.push(format!(
                "norm:{}:even:{},{}",
                self.normalization.render(alpha),
                self.min_level.raw(),
                self.max_level.raw()
            ));
        }
        if self.low_pass_active {
            out.push(format!("low-pass:{}", self.low_pass_threshold.raw()));
        }
        out
    }

    /// Combiner argument; empty unless the lattice is embedded.
    pub fn combiner_arg(&self) -> String {
        if self.embedded {
            self.combiner.to_string()
        } else {
            String::new()
        }
    }

    pub fn invalid_fields(&self) -> Vec<String> {
        let mut out = vec![];
        if !self.embedded {
            return out;
        }
        if self.normalization_active {
            if !self.min_level.is_valid() {
                out.push("multilevel.min-level".to_string());
            }
            if !self.max_level.is_valid() {
                out.push("multilevel.max-level".to_string());
            }
        }
        if self.low_pass_active && !self.low_pass_threshold.is_valid() {
            out.push("multilevel.low-pass-threshold".to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded() -> MultilevelSpec {
        let mut spec = MultilevelSpec::default();
        spec.set_embedded(true);
        spec
    }

    #[test]
    fn not_embedded_emits_nothing() {
        let mut spec = MultilevelSpec::default();
        spec.set_normalization_active(true);
        spec.set_low_pass_active(true);
        assert!(spec.filters("2").is_empty());
        assert_eq!(spec.combiner_arg(), "");
    }

    #[test]
    fn embedded_filters_and_combiner() {
        let mut spec = embedded();
        spec.on_size_exponent(Some(10));
        spec.set_normalization_active(true);
        spec.set_low_pass_active(true);
        spec.set_combiner(Combiner::LevelMax);
        assert_eq!(
            spec.filters("2"),
            vec!["norm:P2-SL10:even:1,10", "low-pass:1.0"]
        );
        assert_eq!(spec.combiner_arg(), "level:max");
    }

    #[test]
    fn levels_are_clamped_and_kept_ordered() {
        let mut spec = embedded();
        spec.on_size_exponent(Some(8));
        spec.set_min_level("12", Some(8));
        assert_eq!(spec.min_level().raw(), "8");
        assert_eq!(spec.max_level().raw(), "8");
        spec.set_max_level("3", Some(8));
        assert_eq!(spec.max_level().raw(), "3");
        assert_eq!(spec.min_level().raw(), "3");
    }

    #[test]
    fn min_level_raises_blank_max() {
        let mut spec = embedded();
        spec.set_min_level("4", None);
        assert_eq!(spec.max_level().raw(), "4");
    }

    #[test]
    fn combiner_wire_forms() {
        for raw in ["sum", "max", "level:max", "level:3"] {
            assert_eq!(raw.parse::<Combiner>().unwrap().to_string(), raw);
        }
        assert!("level:0".parse::<Combiner>().is_err());
        assert!("avg".parse::<Combiner>().is_err());
    }

    #[test]
    fn invalid_threshold_only_counts_when_active() {
        let mut spec = embedded();
        spec.set_low_pass_threshold("x");
        assert!(spec.invalid_fields().is_empty());
        spec.set_low_pass_active(true);
        assert_eq!(spec.invalid_fields(), vec!["multilevel.low-pass-threshold"]);
    }
}
