//! Column-level PII encryption performed inside PostgreSQL by `pgcrypto`.
//!
//! The application never computes ciphertext. Writes bind the plaintext into a
//! `pgp_sym_encrypt(...)` call and reads wrap the column in `pgp_sym_decrypt(...)`,
//! so only ciphertext crosses the storage boundary and plaintext never shows up
//! in statement text.
//!
//! # Wire contract
//!
//! ```text
//! pgp_sym_encrypt(<plaintext>, <passphrase>, 'compress-algo=1, cipher-algo=aes256')
//! pgp_sym_decrypt(<column>, <passphrase>)
//! ```
//!
//! The options string must stay bit-for-bit identical or previously stored
//! ciphertext stops round-tripping.

pub mod column;

pub use column::{ColumnError, EncryptedColumn, Passphrase};
