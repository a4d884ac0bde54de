//! Person records: model, storage trait, and the create / update / fetch operations.
//!
//! `key` is unique and stored in plaintext. `first_name` and `last_name` are
//! PII and only ever stored as `pgcrypto` ciphertext (see [`crate::crypto`]).

pub mod service;
pub mod store;

pub use store::PgPersonStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::StoreError;
use crate::validation::{Collection, FieldSource};

/// Table backing [`Person`].
pub const TABLE: &str = "persons";

/// Unique, plaintext field checked by the uniqueness pre-check.
pub const KEY_FIELD: &str = "key";

/// Name of the database constraint enforcing uniqueness of [`KEY_FIELD`].
pub const KEY_CONSTRAINT: &str = "persons_key_unique";

/// Plaintext view of a stored person.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Person {
    pub id: Uuid,
    pub key: String,
    pub first_name: String,
    pub last_name: String,
}

impl FieldSource for Person {
    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "key" => Some(&self.key),
            "first_name" => Some(&self.first_name),
            "last_name" => Some(&self.last_name),
            _ => None,
        }
    }
}

/// Plaintext columns of a stored person, read without touching ciphertext.
///
/// Updates compare against this instead of [`Person`] so a record whose names
/// no longer decrypt can still be overwritten.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PersonKey {
    pub id: Uuid,
    pub key: String,
}

impl FieldSource for PersonKey {
    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "key" => Some(&self.key),
            _ => None,
        }
    }
}

/// Validated input for an insert or a full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub key: String,
    pub first_name: String,
    pub last_name: String,
}

/// Persistence operations for [`Person`] records.
///
/// The [`Collection`] supertrait answers uniqueness lookups on [`KEY_FIELD`].
#[async_trait]
pub trait PersonStore: Collection {
    /// Load and decrypt a person, or `None` if `id` is unknown.
    async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError>;

    /// Load the plaintext columns of `id` without decrypting, or `None` if unknown.
    async fn find_key(&self, id: Uuid) -> Result<Option<PersonKey>, StoreError>;

    /// Insert a new person with a fresh id.
    async fn insert(&self, person: &NewPerson) -> Result<Person, StoreError>;

    /// Replace all fields of `id`, or `None` if `id` is unknown.
    async fn update(&self, id: Uuid, person: &NewPerson) -> Result<Option<Person>, StoreError>;

    /// Round-trip to the database.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mockall::mock! {
    pub Store {}

    #[async_trait]
    impl Collection for Store {
        async fn first_match(&self, field: &str, value: &str) -> Result<Option<Uuid>, StoreError>;
    }

    #[async_trait]
    impl PersonStore for Store {
        async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError>;
        async fn find_key(&self, id: Uuid) -> Result<Option<PersonKey>, StoreError>;
        async fn insert(&self, person: &NewPerson) -> Result<Person, StoreError>;
        async fn update(&self, id: Uuid, person: &NewPerson) -> Result<Option<Person>, StoreError>;
        async fn ping(&self) -> Result<(), StoreError>;
    }
}
