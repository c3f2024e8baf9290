use crate::error::FormError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of lattice points, either given directly or as `base^exponent`.
///
/// The exponent of an embedded size bounds the levels usable by multilevel
/// filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatticeSize {
    Plain(u64),
    Power { base: u64, exponent: u32 },
}

impl LatticeSize {
    /// Total number of points, `None` on overflow.
    pub fn points(&self) -> Option<u64> {
        match *self {
            Self::Plain(n) => Some(n),
            Self::Power { base, exponent } => base.checked_pow(exponent),
        }
    }

    pub fn exponent(&self) -> Option<u32> {
        match *self {
            Self::Plain(_) => None,
            Self::Power { exponent, .. } => Some(exponent),
        }
    }

    /// Text shown next to the size input, e.g. `" = 1024"` for `2^10`.
    pub fn expansion_label(&self) -> Option<String> {
        match self {
            Self::Plain(_) => None,
            Self::Power { .. } => self.points().map(|n| format!(" = {n}")),
        }
    }
}

impl FromStr for LatticeSize {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || FormError::InvalidSize(s.to_string());
        let positive = |v: u64| if v == 0 { Err(bad()) } else { Ok(v) };
        match s.split_once('^') {
            Some((base, exponent)) => {
                let base = positive(base.trim().parse::<u64>().map_err(|_| bad())?)?;
                let exponent = exponent.trim().parse::<u32>().map_err(|_| bad())?;
                if exponent == 0 {
                    return Err(bad());
                }
                Ok(Self::Power { base, exponent })
            }
            None => Ok(Self::Plain(positive(s.parse::<u64>().map_err(|_| bad())?)?)),
        }
    }
}

impl fmt::Display for LatticeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(n) => write!(f, "{n}"),
            Self::Power { base, exponent } => write!(f, "{base}^{exponent}"),
        }
    }
}
