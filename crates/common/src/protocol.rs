//! Request and response types exchanged over the HTTP API.
//!
//! All bodies are JSON. Person names travel in plaintext here; they only become
//! ciphertext inside the database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationErrors;

// ---------------------------------------------------------------------------
// Persons
// ---------------------------------------------------------------------------

/// Request body for `POST /persons` and `PUT /persons/{id}`.
///
/// Every field is optional at the wire level so that missing fields surface as
/// per-field validation messages rather than a JSON parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonRequest {
    /// Unique external key, stored in plaintext.
    #[serde(default)]
    pub key: Option<String>,
    /// Given name. Stored encrypted.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name. Stored encrypted.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response body for a single person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonResponse {
    /// Server-assigned identifier.
    pub id: Uuid,
    /// Unique external key.
    pub key: String,
    /// Decrypted given name.
    pub first_name: String,
    /// Decrypted family name.
    pub last_name: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"validation_failed"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Per-field validation messages; present only for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            errors: None,
        }
    }

    /// Attach per-field validation messages.
    pub fn with_errors(mut self, errors: ValidationErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the database answered a ping.
    pub database: bool,
}
