//! Configuration loading and validation for the registry service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::Passphrase;

/// Validated registry service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL. **Required.**
    pub database_url: String,

    /// Passphrase handed to `pgp_sym_encrypt` / `pgp_sym_decrypt`. **Required.**
    pub encryption_passphrase: Passphrase,

    /// Upper bound on pooled database connections.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Seconds to wait for a pooled connection before failing a request.
    #[serde(default = "default_database_acquire_timeout")]
    pub database_acquire_timeout_secs: u64,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Maximum length, in characters, of `first_name` and `last_name`.
    #[serde(default = "default_name_max_length")]
    pub name_max_length: usize,

    /// Apply embedded migrations at startup.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,

    /// OTLP gRPC endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database_max_connections() -> u32 {
    5
}
fn default_database_acquire_timeout() -> u64 {
    5
}
fn default_listen_port() -> u16 {
    8080
}
fn default_name_max_length() -> usize {
    255
}
fn default_run_migrations() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.database_url, "DATABASE_URL")?;
        if self.encryption_passphrase.is_blank() {
            anyhow::bail!("ENCRYPTION_PASSPHRASE is required and must not be empty");
        }
        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be > 0");
        }
        if self.database_acquire_timeout_secs == 0 {
            anyhow::bail!("DATABASE_ACQUIRE_TIMEOUT_SECS must be > 0");
        }
        if self.name_max_length == 0 {
            anyhow::bail!("NAME_MAX_LENGTH must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
