//! Create / update / fetch operations shared by the HTTP handlers.
//!
//! Validation runs in a fixed order: required fields, length limits, then the
//! uniqueness pre-check on `key`. All messages land in one [`ValidationErrors`]
//! so a client sees every problem with its request at once.

use common::{
    protocol::PersonRequest,
    validation::{too_long_message, ValidationErrors, REQUIRED_MESSAGE, UNIQUE_MESSAGE},
    ServiceError,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{NewPerson, Person, PersonStore, KEY_CONSTRAINT, KEY_FIELD};
use crate::crypto::ColumnError;
use crate::db::StoreError;
use crate::validation::validate_unique;

/// Validate `req` and insert a new person.
///
/// # Errors
///
/// [`ServiceError::Validation`] for missing, over-long or duplicate fields,
/// otherwise the mapped storage failure.
pub async fn create(
    store: &dyn PersonStore,
    max_name_len: usize,
    req: PersonRequest,
) -> Result<Person, ServiceError> {
    let (errors, input) = check_fields(&req, max_name_len);
    let errors = validate_unique(errors, store, KEY_FIELD, req.key.as_deref(), None)
        .await
        .map_err(map_store_error)?;
    let input = accept(errors, input)?;

    let person = store.insert(&input).await.map_err(map_store_error)?;
    info!(id = %person.id, "person created");
    Ok(person)
}

/// Validate `req` and replace every field of person `id`.
///
/// Keeping the current `key` is not a collision. The existing record is
/// looked up by its plaintext key only, so a row whose names no longer
/// decrypt can be repaired by overwriting them.
///
/// # Errors
///
/// [`ServiceError::NotFound`] if `id` is unknown, [`ServiceError::Validation`]
/// for invalid input, otherwise the mapped storage failure.
pub async fn update(
    store: &dyn PersonStore,
    max_name_len: usize,
    id: Uuid,
    req: PersonRequest,
) -> Result<Person, ServiceError> {
    let existing = store
        .find_key(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| not_found(id))?;

    let (errors, input) = check_fields(&req, max_name_len);
    let errors = validate_unique(errors, store, KEY_FIELD, req.key.as_deref(), Some(&existing))
        .await
        .map_err(map_store_error)?;
    let input = accept(errors, input)?;

    let person = store
        .update(id, &input)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| not_found(id))?;
    info!(id = %person.id, "person updated");
    Ok(person)
}

/// Load and decrypt person `id`.
///
/// # Errors
///
/// [`ServiceError::NotFound`] if `id` is unknown, [`ServiceError::DataIntegrity`]
/// if the stored names cannot be decrypted.
pub async fn fetch(store: &dyn PersonStore, id: Uuid) -> Result<Person, ServiceError> {
    store
        .get(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| not_found(id))
}

/// Required-field and length checks. Returns the input only when every field
/// is present and within bounds.
fn check_fields(req: &PersonRequest, max_name_len: usize) -> (ValidationErrors, Option<NewPerson>) {
    let mut errors = ValidationErrors::new();

    let key = required(&mut errors, KEY_FIELD, req.key.as_deref());
    let first_name = required(&mut errors, "first_name", req.first_name.as_deref());
    let last_name = required(&mut errors, "last_name", req.last_name.as_deref());

    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if let Some(v) = value {
            if v.chars().count() > max_name_len {
                errors.push(field, too_long_message(max_name_len));
            }
        }
    }

    let input = match (key, first_name, last_name) {
        (Some(key), Some(first_name), Some(last_name)) if errors.is_empty() => Some(NewPerson {
            key: key.to_owned(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
        }),
        _ => None,
    };
    (errors, input)
}

fn required<'a>(errors: &mut ValidationErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    if value.is_none() {
        errors.push(field, REQUIRED_MESSAGE);
    }
    value
}

fn accept(errors: ValidationErrors, input: Option<NewPerson>) -> Result<NewPerson, ServiceError> {
    match input {
        Some(input) if errors.is_empty() => Ok(input),
        _ => Err(ServiceError::Validation(errors)),
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("person {id}"))
}

/// Translate a storage failure into the error surfaced to callers.
///
/// Never logs plaintext: only error kinds and constraint names.
pub fn map_store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::Integrity(reason) => {
            error!(%reason, "stored ciphertext failed to decrypt");
            ServiceError::DataIntegrity("stored record could not be decrypted".into())
        }
        StoreError::Conflict(constraint)
            if constraint.is_none() || constraint.as_deref() == Some(KEY_CONSTRAINT) =>
        {
            warn!("unique constraint rejected write after pre-check passed");
            let mut errors = ValidationErrors::new();
            errors.push(KEY_FIELD, UNIQUE_MESSAGE);
            ServiceError::Validation(errors)
        }
        StoreError::Column(ColumnError::TooLong { column, max }) => {
            let mut errors = ValidationErrors::new();
            errors.push(column, too_long_message(max));
            ServiceError::Validation(errors)
        }
        StoreError::Database(
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
        ) => {
            warn!(error = %e, "database unavailable");
            ServiceError::Unavailable("database unavailable".into())
        }
        other => {
            error!(error = %other, "storage failure");
            ServiceError::Internal("storage failure".into())
        }
    }
}
