//! Weight kinds and their wire fragments.
//!
//! Array-based kinds serialize as `<kind>:<last>:<v1>,...,<vn>`; the last
//! value is repeated up front as the default the backend uses for
//! coordinates or orders beyond the supplied array.

use crate::{array_field::ArrayField, error::FormError, validator::Pattern};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_WEIGHT: &str = "0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightKind {
    #[serde(rename = "product")]
    Product,
    #[serde(rename = "order-dependent")]
    OrderDependent,
    #[serde(rename = "POD")]
    Pod,
    #[serde(rename = "projection-dependent")]
    ProjectionDependent,
}

impl WeightKind {
    pub const ALL: [WeightKind; 4] = [
        Self::Product,
        Self::OrderDependent,
        Self::Pod,
        Self::ProjectionDependent,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::OrderDependent => "order-dependent",
            Self::Pod => "POD",
            Self::ProjectionDependent => "projection-dependent",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Product => "Product Weights",
            Self::OrderDependent => "Order-Dependent Weights",
            Self::Pod => "POD Weights",
            Self::ProjectionDependent => "Projection-Dependent Weights",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            Self::Product => "gamma_u = prod_{j in u} gamma_j",
            Self::OrderDependent => "gamma_u = Gamma_{|u|}",
            Self::Pod => "gamma_u = Gamma_{|u|} prod_{j in u} gamma_j",
            Self::ProjectionDependent => "gamma_u given explicitly for each projection u",
        }
    }

    /// The arrays a spec of this kind owns, in wire order.
    pub fn arrays(self) -> &'static [WeightArray] {
        match self {
            Self::Product => &[WeightArray::Coordinate],
            Self::OrderDependent => &[WeightArray::Order],
            Self::Pod => &[WeightArray::Order, WeightArray::Coordinate],
            Self::ProjectionDependent => &[],
        }
    }
}

impl fmt::Display for WeightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for WeightKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormError::unknown("weight kind", s))
    }
}

/// Which array of a weight spec is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightArray {
    Order,
    Coordinate,
}

impl WeightArray {
    pub fn id(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Coordinate => "coordinate",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Order => "Order Weights",
            Self::Coordinate => "Coordinate Weights",
        }
    }

    /// Name of the index variable used in closed-form expressions.
    pub fn index_variable(self) -> &'static str {
        match self {
            Self::Order => "k",
            Self::Coordinate => "j",
        }
    }

    pub fn index_text(self) -> &'static str {
        match self {
            Self::Order => "projection order",
            Self::Coordinate => "coordinate index",
        }
    }

    fn empty_array(self) -> ArrayField {
        ArrayField::new(Pattern::Real, DEFAULT_WEIGHT)
    }
}

impl FromStr for WeightArray {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "order" | "k" => Ok(Self::Order),
            "coordinate" | "coord" | "j" => Ok(Self::Coordinate),
            other => Err(FormError::unknown("weight array", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WeightSpec {
    #[serde(rename = "product")]
    Product { coordinate: ArrayField },
    #[serde(rename = "order-dependent")]
    OrderDependent { order: ArrayField },
    #[serde(rename = "POD")]
    Pod {
        order: ArrayField,
        coordinate: ArrayField,
    },
    #[serde(rename = "projection-dependent")]
    ProjectionDependent { text: String },
}

impl WeightSpec {
    /// A fresh spec of `kind` with every array sized to `dimension`.
    pub fn new(kind: WeightKind, dimension: usize) -> Self {
        let mut ret = match kind {
            WeightKind::Product => Self::Product {
                coordinate: WeightArray::Coordinate.empty_array(),
            },
            WeightKind::OrderDependent => Self::OrderDependent {
                order: WeightArray::Order.empty_array(),
            },
            WeightKind::Pod => Self::Pod {
                order: WeightArray::Order.empty_array(),
                coordinate: WeightArray::Coordinate.empty_array(),
            },
            WeightKind::ProjectionDependent => Self::ProjectionDependent {
                text: String::new(),
            },
        };
        ret.resize(dimension);
        ret
    }

    pub fn kind(&self) -> WeightKind {
        match self {
            Self::Product { .. } => WeightKind::Product,
            Self::OrderDependent { .. } => WeightKind::OrderDependent,
            Self::Pod { .. } => WeightKind::Pod,
            Self::ProjectionDependent { .. } => WeightKind::ProjectionDependent,
        }
    }

    pub fn resize(&mut self, dimension: usize) {
        match self {
            Self::Product { coordinate } => coordinate.resize(dimension),
            Self::OrderDependent { order } => order.resize(dimension),
            Self::Pod { order, coordinate } => {
                order.resize(dimension);
                coordinate.resize(dimension);
            }
            Self::ProjectionDependent { .. } => {}
        }
    }

    pub fn array(&self, which: WeightArray) -> Option<&ArrayField> {
        match (self, which) {
            (Self::Product { coordinate }, WeightArray::Coordinate) => Some(coordinate),
            (Self::OrderDependent { order }, WeightArray::Order) => Some(order),
            (Self::Pod { order, .. }, WeightArray::Order) => Some(order),
            (Self::Pod { coordinate, .. }, WeightArray::Coordinate) => Some(coordinate),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, which: WeightArray) -> Result<&mut ArrayField, FormError> {
        let kind = self.kind();
        match (self, which) {
            (Self::Product { coordinate }, WeightArray::Coordinate) => Ok(coordinate),
            (Self::OrderDependent { order }, WeightArray::Order) => Ok(order),
            (Self::Pod { order, .. }, WeightArray::Order) => Ok(order),
            (Self::Pod { coordinate, .. }, WeightArray::Coordinate) => Ok(coordinate),
            _ => Err(FormError::NoSuchArray {
                kind: kind.id().to_string(),
                array: which.id().to_string(),
            }),
        }
    }

    /// The single array of product and order-dependent weights.
    pub fn primary_array(&self) -> Option<(WeightArray, &ArrayField)> {
        let which = *self.kind().arrays().first()?;
        self.array(which).map(|a| (which, a))
    }

    pub fn set_text(&mut self, new_text: impl Into<String>) -> Result<(), FormError> {
        match self {
            Self::ProjectionDependent { text } => {
                *text = new_text.into();
                Ok(())
            }
            other => Err(FormError::NotTextWeights {
                kind: other.kind().id().to_string(),
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind()
            .arrays()
            .iter()
            .filter_map(|w| self.array(*w))
            .all(ArrayField::is_valid)
    }

    /// Names of invalid inputs, e.g. `weights[1].coordinate[3]` (one-based).
    pub fn invalid_fields(&self, position: usize) -> Vec<String> {
        let mut out = vec![];
        for which in self.kind().arrays() {
            if let Some(array) = self.array(*which) {
                for i in array.invalid_indices() {
                    out.push(format!("weights[{position}].{}[{}]", which.id(), i + 1));
                }
            }
        }
        out
    }

    /// Wire fragment passed to the backend for these weights.
    pub fn fragment(&self) -> String {
        match self {
            Self::Product { coordinate } => format!("product:{}", array_tail(coordinate)),
            Self::OrderDependent { order } => format!("order-dependent:{}", array_tail(order)),
            Self::Pod { order, coordinate } => {
                format!("POD:{}:{}", array_tail(order), array_tail(coordinate))
            }
            Self::ProjectionDependent { text } => projection_fragment(text),
        }
    }
}

fn array_tail(array: &ArrayField) -> String {
    format!("{}:{}", array.last_value().unwrap_or_default(), array.join(","))
}

/// Lines are `<coords>:<weight>`; whitespace is dropped and blank lines are
/// skipped. Line syntax is left to the backend.
fn projection_fragment(text: &str) -> String {
    let mut ret = WeightKind::ProjectionDependent.id().to_string();
    for line in text.split('\n') {
        let compact: String = line.trim().chars().filter(|c| !c.is_whitespace()).collect();
        if !compact.is_empty() {
            ret.push(':');
            ret.push_str(&compact);
        }
    }
    ret
}
