//! Construction methods and the construction argument of a search request.
//!
//! Every method declares its wire template as a list of segments. The
//! textual template, the substituted argument and the set of sub-fields a
//! method needs are all derived from that one declaration.

use crate::{
    array_field::ArrayField,
    error::FormError,
    validator::{Pattern, ScalarField},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const DEFAULT_RANDOM_SAMPLES: &str = "30";
pub const DEFAULT_GENERATOR_COMPONENT: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    RandomSamples,
    GeneratingVector,
}

impl Placeholder {
    pub fn token(self) -> &'static str {
        match self {
            Self::RandomSamples => "{nrand}",
            Self::GeneratingVector => "{gen}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Field(Placeholder),
}

/// Backend capability a method depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    CoordUniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequiredFields {
    pub random_samples: bool,
    pub generating_vector: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionMethod {
    #[serde(rename = "explicit")]
    Explicit,
    #[serde(rename = "exhaustive")]
    Exhaustive,
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "Korobov")]
    Korobov,
    #[serde(rename = "random-Korobov")]
    RandomKorobov,
    #[serde(rename = "CBC")]
    Cbc,
    #[serde(rename = "random-CBC")]
    RandomCbc,
    #[serde(rename = "fast-CBC")]
    FastCbc,
}

use Placeholder::{GeneratingVector, RandomSamples};
use Segment::{Field, Literal};

impl ConstructionMethod {
    pub const ALL: [ConstructionMethod; 8] = [
        Self::Explicit,
        Self::Exhaustive,
        Self::Random,
        Self::Korobov,
        Self::RandomKorobov,
        Self::Cbc,
        Self::RandomCbc,
        Self::FastCbc,
    ];

    /// Method selected when the current one becomes unavailable.
    pub const FALLBACK: ConstructionMethod = Self::Cbc;

    pub fn id(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Exhaustive => "exhaustive",
            Self::Random => "random",
            Self::Korobov => "Korobov",
            Self::RandomKorobov => "random-Korobov",
            Self::Cbc => "CBC",
            Self::RandomCbc => "random-CBC",
            Self::FastCbc => "fast-CBC",
        }
    }

    pub fn segments(self) -> &'static [Segment] {
        match self {
            Self::Explicit => &[Literal("explicit:"), Field(GeneratingVector)],
            Self::Exhaustive => &[Literal("exhaustive")],
            Self::Random => &[Literal("random:"), Field(RandomSamples)],
            Self::Korobov => &[Literal("Korobov")],
            Self::RandomKorobov => &[Literal("random-Korobov:"), Field(RandomSamples)],
            Self::Cbc => &[Literal("CBC")],
            Self::RandomCbc => &[Literal("random-CBC:"), Field(RandomSamples)],
            Self::FastCbc => &[Literal("fast-CBC")],
        }
    }

    pub fn template(self) -> String {
        self.segments()
            .iter()
            .map(|s| match s {
                Literal(text) => *text,
                Field(p) => p.token(),
            })
            .collect()
    }

    pub fn required_fields(self) -> RequiredFields {
        let has = |p: Placeholder| self.segments().contains(&Field(p));
        RequiredFields {
            random_samples: has(RandomSamples),
            generating_vector: has(GeneratingVector),
        }
    }

    pub fn requirement(self) -> Option<Capability> {
        match self {
            Self::FastCbc => Some(Capability::CoordUniform),
            _ => None,
        }
    }

    pub fn is_available(self, coord_uniform: bool) -> bool {
        match self.requirement() {
            Some(Capability::CoordUniform) => coord_uniform,
            None => true,
        }
    }

    /// Substitutes every placeholder of the template.
    pub fn render(self, random_samples: &str, generating_vector: &str) -> String {
        self.segments()
            .iter()
            .map(|s| match s {
                Literal(text) => *text,
                Field(RandomSamples) => random_samples,
                Field(GeneratingVector) => generating_vector,
            })
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Explicit => "Explicit (Evaluation)",
            Self::Exhaustive => "Exhaustive",
            Self::Random => "Random",
            Self::Korobov => "Korobov",
            Self::RandomKorobov => "Random Korobov",
            Self::Cbc => "CBC",
            Self::RandomCbc => "Random CBC",
            Self::FastCbc => "Fast CBC",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Explicit => {
                "Evaluates the figure of merit for a given generating vector a = (a_1, ..., a_s)."
            }
            Self::Exhaustive => "Examines all generating vectors and retains the best one.",
            Self::Random => {
                "Examines a number r of randomly selected generating vectors a and retains the best one."
            }
            Self::Korobov => {
                "Examines all generating vectors of the form a = (1, a mod n, a^2 mod n, ..., a^s mod n) and retains the best one."
            }
            Self::RandomKorobov => {
                "Examines a number r of randomly selected generating vectors of the form a = (1, a mod n, a^2 mod n, ..., a^s mod n) and retains the best one."
            }
            Self::Cbc => {
                "Examines all possible values of the components a_j of the generating vector and selects the best ones, one coordinate at a time."
            }
            Self::RandomCbc => {
                "Examines a number r of randomly selected values for each component a_j of the generating vector and selects the best ones, one coordinate at a time."
            }
            Self::FastCbc => {
                "Component-by-component construction accelerated with fast Fourier transforms. Requires the coordinate-uniform evaluation method."
            }
        }
    }

    /// Label of the random sample count input, when the method has one.
    pub fn random_samples_label(self) -> Option<&'static str> {
        match self {
            Self::Random => Some("Number r of random samples of a"),
            Self::RandomKorobov => Some("Number r of random samples of a"),
            Self::RandomCbc => Some("Number r of random samples of a_j for each j"),
            _ => None,
        }
    }
}

impl fmt::Display for ConstructionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Accepts the short id (`random-CBC`) or the full template
/// (`random-CBC:{nrand}`).
impl FromStr for ConstructionMethod {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.id() == s || m.template() == s)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|m| m.id().eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| FormError::unknown("construction method", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSpec {
    method: ConstructionMethod,
    random_samples: ScalarField,
    generating_vector: ArrayField,
}

impl ConstructionSpec {
    pub fn new(dimension: usize) -> Self {
        Self {
            method: ConstructionMethod::Cbc,
            random_samples: ScalarField::new(Pattern::Integer, DEFAULT_RANDOM_SAMPLES),
            generating_vector: ArrayField::with_len(
                Pattern::Integer,
                DEFAULT_GENERATOR_COMPONENT,
                dimension,
            ),
        }
    }

    pub fn method(&self) -> ConstructionMethod {
        self.method
    }

    pub fn random_samples(&self) -> &ScalarField {
        &self.random_samples
    }

    pub fn generating_vector(&self) -> &ArrayField {
        &self.generating_vector
    }

    pub fn required_fields(&self) -> RequiredFields {
        self.method.required_fields()
    }

    pub fn set_random_samples(&mut self, raw: impl Into<String>) -> bool {
        self.random_samples.set(raw)
    }

    pub fn set_generator_component(
        &mut self,
        index: usize,
        raw: impl Into<String>,
    ) -> Result<bool, FormError> {
        let len = self.generating_vector.len();
        self.generating_vector
            .set(index, raw)
            .ok_or(FormError::IndexOutOfRange { index, len })
    }

    pub fn set_generating_vector<S: AsRef<str>>(&mut self, values: &[S]) {
        self.generating_vector.set_values(values);
    }

    pub fn resize(&mut self, dimension: usize) {
        self.generating_vector.resize(dimension);
    }

    /// Selects `method`; refused when it needs coordinate-uniform evaluation
    /// and that is not enabled.
    pub fn select(
        &mut self,
        method: ConstructionMethod,
        coord_uniform: bool,
    ) -> Result<(), FormError> {
        if !method.is_available(coord_uniform) {
            return Err(FormError::MethodNotSelectable {
                method: method.id().to_string(),
                reason: "requires coordinate-uniform evaluation".to_string(),
            });
        }
        self.method = method;
        Ok(())
    }

    /// Switches to the fallback method when the current one lost its
    /// capability. Returns whether a switch happened.
    pub fn enforce_capabilities(&mut self, coord_uniform: bool) -> bool {
        if self.method.is_available(coord_uniform) {
            return false;
        }
        self.method = ConstructionMethod::FALLBACK;
        true
    }

    /// Fills the generating vector from numeric values, reducing each
    /// component modulo the number of points when it is known.
    pub fn fill_generating_vector(&mut self, values: &[f64], modulus: Option<u64>) {
        let text: Vec<String> = values
            .iter()
            .map(|v| match modulus {
                Some(n) if n > 0 => format_number(v.rem_euclid(n as f64)),
                _ => format_number(*v),
            })
            .collect();
        self.generating_vector.set_values(&text);
    }

    /// Copies a generating vector found by a previous search into the first
    /// components; the length of the form vector is kept.
    pub fn copy_generator(&mut self, generator: &[u64]) {
        let mut current = self.generating_vector.values();
        for (slot, value) in current.iter_mut().zip(generator) {
            *slot = value.to_string();
        }
        self.generating_vector.set_values(&current);
    }

    pub fn invalid_fields(&self) -> Vec<String> {
        let required = self.required_fields();
        let mut out = vec![];
        if required.random_samples && !self.random_samples.is_valid() {
            out.push("construction.random-samples".to_string());
        }
        if required.generating_vector {
            for i in self.generating_vector.invalid_indices() {
                out.push(format!("construction.generating-vector[{}]", i + 1));
            }
        }
        out
    }

    /// The construction argument of a search request.
    pub fn build_arg(&self) -> String {
        self.method.render(
            self.random_samples.raw(),
            &self.generating_vector.join(","),
        )
    }
}

/// Formats numbers the way they are shown in inputs: integral values
/// without a fractional part.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}
