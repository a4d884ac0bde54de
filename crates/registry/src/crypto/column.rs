//! [`EncryptedColumn`]: statement fragments that encrypt on write and decrypt on read.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;

/// `pgcrypto` options passed to every `pgp_sym_encrypt` call.
pub const CIPHER_OPTIONS: &str = "compress-algo=1, cipher-algo=aes256";

/// Process-wide secret used by `pgp_sym_encrypt` / `pgp_sym_decrypt`.
///
/// Cheap to clone. `Debug` never prints the secret, so configuration structs
/// holding a [`Passphrase`] can derive `Debug` safely.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub struct Passphrase(Arc<str>);

impl Passphrase {
    /// Borrow the secret. Only bind it as a statement parameter; never log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the passphrase is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Errors produced by the column adapter before a statement is sent.
#[derive(Debug, Error)]
pub enum ColumnError {
    /// The column was defined without usable key material.
    #[error("encryption passphrase for column {0} must not be empty")]
    EmptyPassphrase(&'static str),

    /// The plaintext has more characters than the column allows.
    #[error("value for column {column} exceeds {max} characters")]
    TooLong {
        /// Column name.
        column: &'static str,
        /// Declared maximum plaintext length in characters.
        max: usize,
    },
}

/// A `BYTEA` column whose stored bytes are always `pgcrypto` ciphertext.
#[derive(Debug, Clone)]
pub struct EncryptedColumn {
    name: &'static str,
    passphrase: Passphrase,
    max_len: Option<usize>,
}

impl EncryptedColumn {
    /// Define an encrypted column.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnError::EmptyPassphrase`] if `passphrase` is blank.
    pub fn new(
        name: &'static str,
        passphrase: Passphrase,
        max_len: Option<usize>,
    ) -> Result<Self, ColumnError> {
        if passphrase.is_blank() {
            return Err(ColumnError::EmptyPassphrase(name));
        }
        Ok(Self {
            name,
            passphrase,
            max_len,
        })
    }

    /// Check `plaintext` against the declared maximum length (in characters).
    ///
    /// # Errors
    ///
    /// Returns [`ColumnError::TooLong`] when the limit is exceeded.
    pub fn check_len(&self, plaintext: &str) -> Result<(), ColumnError> {
        match self.max_len {
            Some(max) if plaintext.chars().count() > max => Err(ColumnError::TooLong {
                column: self.name,
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Write path: append an expression that encrypts `plaintext` inside the engine.
    ///
    /// Both the plaintext and the passphrase are bound as parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnError::TooLong`] if `plaintext` exceeds the maximum length.
    pub fn push_encrypt(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        plaintext: &str,
    ) -> Result<(), ColumnError> {
        self.check_len(plaintext)?;
        qb.push("pgp_sym_encrypt(")
            .push_bind(plaintext.to_owned())
            .push(", ")
            .push_bind(self.passphrase.expose().to_owned())
            .push(", '")
            .push(CIPHER_OPTIONS)
            .push("')");
        Ok(())
    }

    /// Read path: append an expression that decrypts this column to `text`.
    ///
    /// A wrong passphrase or tampered ciphertext makes the engine raise
    /// SQLSTATE `39000`, which the store maps to an integrity error.
    pub fn push_decrypt(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push("pgp_sym_decrypt(")
            .push(self.name)
            .push(", ")
            .push_bind(self.passphrase.expose().to_owned())
            .push(")");
    }
}
