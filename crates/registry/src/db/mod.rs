//! PostgreSQL pool bootstrap, embedded migrations, and storage error mapping.
//!
//! # Error mapping
//!
//! | SQLSTATE | meaning                                  | [`StoreError`]            |
//! |----------|------------------------------------------|---------------------------|
//! | `39000`  | `pgcrypto`: wrong key or corrupt data    | [`StoreError::Integrity`] |
//! | `23505`  | unique constraint violated               | [`StoreError::Conflict`]  |
//! | `22021`  | decrypted bytes are not valid text (reads only, see [`StoreError::from_decrypt`]) | [`StoreError::Integrity`] |
//! | other    | anything else                            | [`StoreError::Database`]  |

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::crypto::ColumnError;

/// SQLSTATE raised by `pgcrypto` when decryption fails.
pub const SQLSTATE_EXTERNAL_ROUTINE: &str = "39000";

/// SQLSTATE raised on a unique constraint violation.
pub const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE raised when bytes cannot be converted to the database encoding.
pub const SQLSTATE_CHARACTER_NOT_IN_REPERTOIRE: &str = "22021";

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored ciphertext could not be decrypted. Not recoverable locally.
    #[error("stored data failed integrity check: {0}")]
    Integrity(String),

    /// A write hit a unique constraint. Carries the constraint name when known.
    #[error("unique constraint violated: {}", .0.as_deref().unwrap_or("unknown"))]
    Conflict(Option<String>),

    /// The field is not queryable on this collection.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The value was rejected by the column adapter before reaching the database.
    #[error(transparent)]
    Column(#[from] ColumnError),

    /// Any other database or driver failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let details = err.as_database_error().map(|db| {
            (
                db.code().map(|c| c.into_owned()),
                db.message().to_owned(),
                db.constraint().map(str::to_owned),
            )
        });
        let Some((code, message, constraint)) = details else {
            return StoreError::Database(err);
        };
        match code.as_deref() {
            Some(SQLSTATE_EXTERNAL_ROUTINE) => StoreError::Integrity(message),
            Some(SQLSTATE_UNIQUE_VIOLATION) => StoreError::Conflict(constraint),
            _ => StoreError::Database(err),
        }
    }
}

impl StoreError {
    /// Map a failure from a statement that decrypts columns.
    ///
    /// Plaintext is always bound from valid UTF-8, so an encoding error there
    /// can only come from `pgp_sym_decrypt` output and counts as corrupt data.
    pub fn from_decrypt(err: sqlx::Error) -> Self {
        let invalid_text = err
            .as_database_error()
            .filter(|db| db.code().as_deref() == Some(SQLSTATE_CHARACTER_NOT_IN_REPERTOIRE))
            .map(|db| db.message().to_owned());
        match invalid_text {
            Some(message) => StoreError::Integrity(message),
            None => StoreError::from(err),
        }
    }
}

/// Build the connection pool described by `cfg`.
///
/// # Errors
///
/// Returns an error if the URL is invalid or no connection can be established
/// within the acquire timeout.
pub async fn connect(cfg: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database_max_connections)
        .acquire_timeout(Duration::from_secs(cfg.database_acquire_timeout_secs))
        .connect(&cfg.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    info!(
        max_connections = cfg.database_max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Apply the embedded migrations (pgcrypto extension + `persons` table).
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply database migrations")?;
    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "postgres error {}", self.code)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "Wrong key or corrupt data"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                SQLSTATE_UNIQUE_VIOLATION => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn pg_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure { code, constraint }))
    }

    #[test]
    fn decryption_failure_maps_to_integrity() {
        let err = StoreError::from(pg_error("39000", None));
        assert!(
            matches!(err, StoreError::Integrity(ref m) if m == "Wrong key or corrupt data"),
            "got {err:?}"
        );
    }

    #[test]
    fn unique_violation_maps_to_conflict_with_constraint() {
        let err = StoreError::from(pg_error("23505", Some("persons_key_unique")));
        assert!(
            matches!(err, StoreError::Conflict(Some(ref c)) if c == "persons_key_unique"),
            "got {err:?}"
        );
    }

    #[test]
    fn other_sqlstates_stay_database() {
        let err = StoreError::from(pg_error("42P01", None));
        assert!(matches!(err, StoreError::Database(_)), "got {err:?}");
    }

    #[test]
    fn invalid_decrypted_text_is_integrity_only_on_read_paths() {
        let read = StoreError::from_decrypt(pg_error("22021", None));
        assert!(matches!(read, StoreError::Integrity(_)), "got {read:?}");

        let plain = StoreError::from(pg_error("22021", None));
        assert!(matches!(plain, StoreError::Database(_)), "got {plain:?}");
    }

    #[test]
    fn decrypt_paths_keep_the_regular_mapping() {
        assert!(matches!(
            StoreError::from_decrypt(pg_error("39000", None)),
            StoreError::Integrity(_)
        ));
        assert!(matches!(
            StoreError::from_decrypt(pg_error("23505", Some("persons_key_unique"))),
            StoreError::Conflict(Some(_))
        ));
        assert!(matches!(
            StoreError::from_decrypt(sqlx::Error::PoolTimedOut),
            StoreError::Database(sqlx::Error::PoolTimedOut)
        ));
    }

    #[test]
    fn non_database_errors_stay_database() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn conflict_display_names_constraint() {
        let err = StoreError::Conflict(Some("persons_key_unique".into()));
        assert!(err.to_string().contains("persons_key_unique"));
        assert!(StoreError::Conflict(None).to_string().contains("unknown"));
    }

    #[test]
    fn column_errors_convert() {
        let err: StoreError = ColumnError::TooLong {
            column: "first_name",
            max: 3,
        }
        .into();
        assert!(matches!(err, StoreError::Column(_)));
    }
}
