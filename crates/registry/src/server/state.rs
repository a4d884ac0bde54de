//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::persons::PersonStore;

/// Application state shared across all request handlers.
///
/// Cheap to clone: the store sits behind an `Arc` so Axum can hand a copy to
/// each request.
#[derive(Clone)]
pub struct AppState {
    /// Person persistence; also answers uniqueness lookups.
    pub store: Arc<dyn PersonStore>,
    /// Maximum length, in characters, accepted for encrypted name fields.
    pub name_max_length: usize,
}

impl AppState {
    /// Create a new [`AppState`] around `store`.
    pub fn new(store: Arc<dyn PersonStore>, name_max_length: usize) -> Self {
        Self {
            store,
            name_max_length,
        }
    }
}
