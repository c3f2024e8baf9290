//! Pattern-based acceptance tests for single form inputs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::LazyLock};

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]+[0-9]*$").expect("integer pattern"));
static REAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]*\.?[0-9]+|[0-9]+\.?[0-9]*)(e[+-]?[0-9]+)?$").expect("real pattern")
});
static REAL_NONNEG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]*\.?[0-9]+|[0-9]+\.?[0-9]*)(e[+-]?[0-9]+)?$")
        .expect("non-negative real pattern")
});
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*(\^[1-9][0-9]*)?$").expect("size pattern"));

pub const NORM_INFINITY: &str = "inf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    Integer,
    Real,
    RealNonneg,
    NormToken,
    Size,
    Free,
}

impl Pattern {
    pub fn accepts(self, raw: &str) -> bool {
        let value = raw.trim();
        if value.is_empty() {
            return true;
        }
        match self {
            Self::Integer => INTEGER_RE.is_match(value),
            Self::Real => REAL_RE.is_match(value),
            Self::RealNonneg => REAL_NONNEG_RE.is_match(value),
            Self::NormToken => value == NORM_INFINITY || REAL_NONNEG_RE.is_match(value),
            Self::Size => SIZE_RE.is_match(value),
            Self::Free => true,
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::Integer => "must be a positive integer",
            Self::Real => "must be a real number",
            Self::RealNonneg => "must be a non-negative real number",
            Self::NormToken => "must be a non-negative real number or 'inf'",
            Self::Size => "must be a positive integer or of the form base^exponent",
            Self::Free => "",
        }
    }
}

/// Returns whether `raw` is acceptable for `pattern`. Blank input is always
/// accepted; the value is treated as not yet provided.
pub fn validate(pattern: Pattern, raw: &str) -> bool {
    pattern.accepts(raw)
}

/// One editable scalar input with its validity flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct ScalarField {
    pattern: Pattern,
    raw: String,
    valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawField {
    pattern: Pattern,
    #[serde(default)]
    raw: String,
}

impl From<RawField> for ScalarField {
    fn from(f: RawField) -> Self {
        Self::new(f.pattern, f.raw)
    }
}

impl From<ScalarField> for RawField {
    fn from(f: ScalarField) -> Self {
        Self {
            pattern: f.pattern,
            raw: f.raw,
        }
    }
}

impl ScalarField {
    pub fn new(pattern: Pattern, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let valid = pattern.accepts(&raw);
        Self {
            pattern,
            raw,
            valid,
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn trimmed(&self) -> &str {
        self.raw.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Replaces the raw value and revalidates. Returns the new validity.
    pub fn set(&mut self, raw: impl Into<String>) -> bool {
        self.raw = raw.into();
        self.valid = self.pattern.accepts(&self.raw);
        self.valid
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error_message(&self) -> Option<String> {
        if self.valid {
            None
        } else {
            Some(format!("'{}' {}", self.raw.trim(), self.pattern.hint()))
        }
    }

    /// Parses the trimmed value; `None` when blank, invalid or unparsable.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        if !self.valid || self.is_blank() {
            return None;
        }
        self.trimmed().parse::<T>().ok()
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC: [Pattern; 5] = [
        Pattern::Integer,
        Pattern::Real,
        Pattern::RealNonneg,
        Pattern::NormToken,
        Pattern::Size,
    ];

    #[test]
    fn integer_pattern() {
        assert!(validate(Pattern::Integer, "123"));
        assert!(validate(Pattern::Integer, "7"));
        assert!(!validate(Pattern::Integer, "0123"));
        assert!(!validate(Pattern::Integer, "-5"));
        assert!(!validate(Pattern::Integer, "0"));
        assert!(!validate(Pattern::Integer, "1.0"));
    }

    #[test]
    fn norm_token_pattern() {
        assert!(validate(Pattern::NormToken, "1.5e-3"));
        assert!(validate(Pattern::NormToken, "inf"));
        assert!(validate(Pattern::NormToken, "2"));
        assert!(!validate(Pattern::NormToken, "-2"));
        assert!(!validate(Pattern::NormToken, "Inf"));
    }

    #[test]
    fn real_patterns() {
        assert!(validate(Pattern::Real, "-0.5"));
        assert!(validate(Pattern::Real, "+.5e+2"));
        assert!(validate(Pattern::Real, "3."));
        assert!(!validate(Pattern::RealNonneg, "-0.5"));
        assert!(validate(Pattern::RealNonneg, "0.5"));
    }

    #[test]
    fn size_pattern() {
        assert!(validate(Pattern::Size, "1024"));
        assert!(validate(Pattern::Size, "2^10"));
        assert!(!validate(Pattern::Size, "2^"));
        assert!(!validate(Pattern::Size, "0^3"));
    }

    #[test]
    fn garbage_rejected_by_numeric_patterns() {
        for pattern in NUMERIC {
            assert!(!validate(pattern, "abc"), "{pattern:?} accepted 'abc'");
        }
        assert!(validate(Pattern::Free, "abc"));
    }

    #[test]
    fn empty_is_always_valid() {
        for pattern in NUMERIC.iter().copied().chain([Pattern::Free]) {
            assert!(validate(pattern, ""));
            assert!(validate(pattern, "   "));
        }
    }

    #[test]
    fn value_is_trimmed_before_matching() {
        assert!(validate(Pattern::Integer, " 42 "));
    }

    #[test]
    fn scalar_field_tracks_validity_and_message() {
        let mut field = ScalarField::new(Pattern::Integer, "30");
        assert!(field.is_valid());
        assert_eq!(field.parse::<u64>(), Some(30));
        assert!(!field.set("x"));
        assert!(field.error_message().unwrap().contains("positive integer"));
        assert_eq!(field.parse::<u64>(), None);
        assert!(field.set(""));
        assert!(field.error_message().is_none());
    }

    #[test]
    fn scalar_field_revalidates_on_deserialize() {
        let field: ScalarField =
            serde_json::from_str(r#"{"pattern":"integer","raw":"0"}"#).expect("parse field");
        assert!(!field.is_valid());
    }
}
