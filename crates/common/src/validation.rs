//! Field-level validation message accumulator.
//!
//! Validators receive a [`ValidationErrors`] by value, append to it, and hand it
//! back. There is no ambient error state: whoever created the accumulator decides
//! how to surface it (the HTTP layer turns a non-empty one into a 422).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Message appended when a candidate value collides with another record.
pub const UNIQUE_MESSAGE: &str = "Value must be unique.";

/// Message appended when a required field is absent.
pub const REQUIRED_MESSAGE: &str = "Missing data for required field.";

/// Message appended when a value exceeds its declared maximum length.
pub fn too_long_message(max: usize) -> String {
    format!("Longer than maximum length {max}.")
}

/// Mapping of field name to the ordered list of messages raised against it.
///
/// Serialises as a plain JSON object, e.g. `{"key": ["Value must be unique."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` to the list for `field`, creating the list if absent.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages recorded against `field`, in insertion order.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns `true` if no field has any message.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields carrying at least one message.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}
