//! Pre-write field validation against already persisted records.
//!
//! [`validate_unique`] is a pre-check only. Two concurrent requests can both
//! pass it for the same value; the database `UNIQUE` constraint is what
//! actually rejects the second write, and the store reports that as
//! [`StoreError::Conflict`](crate::db::StoreError::Conflict).

pub mod postgres;
pub mod unique;

pub use postgres::PgCollection;
pub use unique::{validate_unique, Collection, FieldSource};
