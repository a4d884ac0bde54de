//! Common types, protocol definitions, and errors shared across `pii-registry` crates.

pub mod error;
pub mod protocol;
pub mod validation;

pub use error::ServiceError;
pub use validation::ValidationErrors;
