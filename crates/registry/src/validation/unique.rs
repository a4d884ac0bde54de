//! Uniqueness validation of a candidate field value.

use async_trait::async_trait;
use common::validation::{ValidationErrors, UNIQUE_MESSAGE};
use tracing::debug;
use uuid::Uuid;

use crate::db::StoreError;

#[cfg(test)]
use mockall::automock;

/// A queryable set of existing records of one kind.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Collection: Send + Sync {
    /// Id of the first record whose `field` equals `value`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownField`] if `field` is not queryable, or any
    /// storage failure.
    async fn first_match(&self, field: &str, value: &str) -> Result<Option<Uuid>, StoreError>;
}

/// Read access to a record's current field values by name.
pub trait FieldSource {
    /// Current value of `field`, or `None` if the record has no such field.
    fn field_value(&self, field: &str) -> Option<&str>;
}

/// Append [`UNIQUE_MESSAGE`] to `errors[field]` if `value` already belongs to
/// another record in `collection`.
///
/// - An absent `value` is not a violation; `errors` comes back untouched.
/// - When `update` is the record being edited and it already holds `value`,
///   the edit is a no-op and no query is issued.
/// - At most one message is appended per call.
///
/// # Errors
///
/// Propagates storage failures from [`Collection::first_match`]. A missing
/// match is the success path, not an error.
pub async fn validate_unique<C>(
    mut errors: ValidationErrors,
    collection: &C,
    field: &str,
    value: Option<&str>,
    update: Option<&(dyn FieldSource + Sync)>,
) -> Result<ValidationErrors, StoreError>
where
    C: Collection + ?Sized,
{
    let Some(value) = value else {
        return Ok(errors);
    };

    if let Some(existing) = update {
        if existing.field_value(field) == Some(value) {
            return Ok(errors);
        }
    }

    if let Some(conflicting_id) = collection.first_match(field, value).await? {
        debug!(field, %conflicting_id, "value already taken");
        errors.push(field, UNIQUE_MESSAGE);
    }
    Ok(errors)
}
