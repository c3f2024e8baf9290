//! Figures of merit: kind, alpha, norm helpers and the `CU:` prefix.

use crate::{
    construction::format_number,
    error::FormError,
    validator::{NORM_INFINITY, Pattern, ScalarField},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_ALPHA: &str = "2";
pub const DEFAULT_NORM_TYPE: &str = "2";

const ALPHA_TOKEN: &str = "{alpha}";
const CU_TOKEN: &str = "{CU}";
const CU_PREFIX: &str = "CU:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FigureKind {
    #[serde(rename = "P-alpha")]
    PAlpha,
    #[serde(rename = "R-alpha")]
    RAlpha,
    #[serde(rename = "spectral")]
    Spectral,
}

impl FigureKind {
    pub const ALL: [FigureKind; 3] = [Self::PAlpha, Self::RAlpha, Self::Spectral];

    pub fn id(self) -> &'static str {
        match self {
            Self::PAlpha => "P-alpha",
            Self::RAlpha => "R-alpha",
            Self::Spectral => "spectral",
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            Self::PAlpha => "{CU}P{alpha}",
            Self::RAlpha => "{CU}R{alpha}",
            Self::Spectral => "spectral",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PAlpha => "P_alpha",
            Self::RAlpha => "R_alpha",
            Self::Spectral => "spectral",
        }
    }

    pub fn supports_coord_uniform(self) -> bool {
        self.template().contains(CU_TOKEN)
    }

    pub fn has_alpha(self) -> bool {
        self.template().contains(ALPHA_TOKEN)
    }

    pub fn alpha_hint(self) -> Option<&'static str> {
        match self {
            Self::PAlpha => Some("alpha = 2,4,6"),
            Self::RAlpha => Some("alpha > 0"),
            Self::Spectral => None,
        }
    }
}

impl fmt::Display for FigureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for FigureKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "P-alpha" | "Palpha" | "P" | "{CU}P{alpha}" => Ok(Self::PAlpha),
            "R-alpha" | "Ralpha" | "R" | "{CU}R{alpha}" => Ok(Self::RAlpha),
            "spectral" => Ok(Self::Spectral),
            other => Err(FormError::unknown("figure of merit", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureSpec {
    kind: FigureKind,
    alpha: ScalarField,
}

impl Default for FigureSpec {
    fn default() -> Self {
        Self {
            kind: FigureKind::PAlpha,
            alpha: ScalarField::new(Pattern::RealNonneg, DEFAULT_ALPHA),
        }
    }
}

impl FigureSpec {
    pub fn kind(&self) -> FigureKind {
        self.kind
    }

    pub fn alpha(&self) -> &ScalarField {
        &self.alpha
    }

    pub fn set_kind(&mut self, kind: FigureKind) {
        self.kind = kind;
        self.adjust_alpha();
    }

    pub fn set_alpha(&mut self, raw: impl Into<String>) -> bool {
        self.alpha.set(raw)
    }

    /// For P_alpha, snaps alpha to the nearest of 2, 4, 6. Blank or invalid
    /// values are left for the validator to flag.
    pub fn adjust_alpha(&mut self) {
        if self.kind != FigureKind::PAlpha {
            return;
        }
        if let Some(alpha) = self.alpha.parse::<f64>() {
            let snapped = 2.0 * (alpha / 2.0).round().clamp(1.0, 3.0);
            self.alpha.set(format_number(snapped));
        }
    }

    pub fn alpha_visible(&self) -> bool {
        self.kind.has_alpha()
    }

    /// Figure argument of a search request; `CU:` is inserted only when
    /// coordinate-uniform evaluation is on and the norm type is 2.
    pub fn render(&self, norm_type: &str, coord_uniform: bool) -> String {
        let cu = if coord_uniform && norm_is_two(norm_type) {
            CU_PREFIX
        } else {
            ""
        };
        self.kind
            .template()
            .replacen(ALPHA_TOKEN, self.alpha.trimmed(), 1)
            .replacen(CU_TOKEN, cu, 1)
    }
}

pub fn norm_is_two(norm_type: &str) -> bool {
    norm_type.trim().parse::<f64>().is_ok_and(|v| v == 2.0)
}

/// Weight power implied by a norm type: the norm itself, or 1 for `inf`.
pub fn weight_power_for_norm(norm_type: &str) -> String {
    let norm = norm_type.trim();
    if norm == NORM_INFINITY {
        "1".to_string()
    } else {
        norm.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_alpha_and_cu() {
        let fig = FigureSpec::default();
        assert_eq!(fig.render("2", true), "CU:P2");
        assert_eq!(fig.render("2", false), "P2");
        assert_eq!(fig.render("1", true), "P2");
        assert_eq!(fig.render("inf", true), "P2");
    }

    #[test]
    fn spectral_has_neither_alpha_nor_cu() {
        let mut fig = FigureSpec::default();
        fig.set_kind(FigureKind::Spectral);
        assert!(!fig.alpha_visible());
        assert!(!fig.kind().supports_coord_uniform());
        assert_eq!(fig.render("2", true), "spectral");
    }

    #[test]
    fn p_alpha_snaps_to_even_values() {
        let mut fig = FigureSpec::default();
        for (raw, expected) in [("1", "2"), ("3", "4"), ("5", "6"), ("9", "6"), ("4", "4")] {
            fig.set_alpha(raw);
            fig.adjust_alpha();
            assert_eq!(fig.alpha().raw(), expected, "alpha {raw}");
        }
    }

    #[test]
    fn r_alpha_keeps_any_positive_alpha() {
        let mut fig = FigureSpec::default();
        fig.set_kind(FigureKind::RAlpha);
        fig.set_alpha("1.5");
        fig.adjust_alpha();
        assert_eq!(fig.render("2", false), "R1.5");
    }

    #[test]
    fn norm_helpers() {
        assert!(norm_is_two("2"));
        assert!(norm_is_two("2.0"));
        assert!(!norm_is_two("inf"));
        assert_eq!(weight_power_for_norm("inf"), "1");
        assert_eq!(weight_power_for_norm("1.5"), "1.5");
    }
}
