//! Resizable ordered lists of scalar inputs bound to the form dimension.
//!
//! Growing a collection seeds the new slots with the last existing value (or
//! the collection default when there is none). Shrinking drops trailing slots
//! for good: growing again afterwards seeds from the new last slot, it does
//! not bring the discarded values back.

use crate::validator::{Pattern, ScalarField};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayField {
    pattern: Pattern,
    default_value: String,
    fields: Vec<ScalarField>,
}

impl ArrayField {
    pub fn new(pattern: Pattern, default_value: impl Into<String>) -> Self {
        Self {
            pattern,
            default_value: default_value.into(),
            fields: vec![],
        }
    }

    pub fn with_len(pattern: Pattern, default_value: impl Into<String>, len: usize) -> Self {
        let mut ret = Self::new(pattern, default_value);
        ret.resize(len);
        ret
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[ScalarField] {
        &self.fields
    }

    fn seed_value(&self) -> String {
        self.fields
            .last()
            .map(|f| f.trimmed().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.default_value.clone())
    }

    pub fn resize(&mut self, len: usize) {
        if len < self.fields.len() {
            self.fields.truncate(len);
        } else if len > self.fields.len() {
            let seed = self.seed_value();
            let pattern = self.pattern;
            self.fields
                .resize_with(len, || ScalarField::new(pattern, seed.clone()));
        }
    }

    pub fn values(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.raw().to_string()).collect()
    }

    pub fn last_value(&self) -> Option<&str> {
        self.fields.last().map(|f| f.raw())
    }

    /// Resizes to `values.len()` and assigns every slot.
    pub fn set_values<S: AsRef<str>>(&mut self, values: &[S]) {
        self.resize(values.len());
        for (field, value) in self.fields.iter_mut().zip(values) {
            field.set(value.as_ref());
        }
    }

    /// Assigns one slot; returns its new validity, or `None` when `index` is
    /// out of range.
    pub fn set(&mut self, index: usize, raw: impl Into<String>) -> Option<bool> {
        self.fields.get_mut(index).map(|f| f.set(raw))
    }

    pub fn get(&self, index: usize) -> Option<&ScalarField> {
        self.fields.get(index)
    }

    /// One-based slot labels, as displayed next to each input.
    pub fn labels(&self) -> Vec<usize> {
        (1..=self.fields.len()).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(ScalarField::is_valid)
    }

    pub fn invalid_indices(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_valid())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn join(&self, separator: &str) -> String {
        self.values().join(separator)
    }
}
