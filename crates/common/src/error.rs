//! Common error types shared across crates.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Validation`] → 422
/// - [`ServiceError::DataIntegrity`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — unparseable id or invalid JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// One or more fields failed validation. Carries the per-field messages.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Stored ciphertext could not be decrypted (wrong passphrase or corrupt data).
    #[error("data integrity failure: {0}")]
    DataIntegrity(String),

    /// A required dependency (the database) is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Validation(_) => 422,
            ServiceError::DataIntegrity(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::DataIntegrity(_) => "data_integrity",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            ServiceError::Validation(ValidationErrors::new()).http_status(),
            422
        );
        assert_eq!(ServiceError::DataIntegrity("x".into()).http_status(), 500);
        assert_eq!(ServiceError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::NotFound("person 42".into());
        assert!(e.to_string().contains("person 42"));
    }

    #[test]
    fn codes_are_snake_case() {
        assert_eq!(ServiceError::DataIntegrity("x".into()).code(), "data_integrity");
        assert_eq!(
            ServiceError::Validation(ValidationErrors::new()).code(),
            "validation_failed"
        );
    }
}
