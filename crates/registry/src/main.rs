//! `pii-registry` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise telemetry (JSON logs, optional OTLP span export).
//! 3. Connect the PostgreSQL pool and apply embedded migrations.
//! 4. Build the person store with its encrypted name columns.
//! 5. Build the Axum router and serve until Ctrl-C / SIGTERM.

mod config;
mod crypto;
mod db;
mod persons;
mod server;
mod telemetry;
mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use persons::PgPersonStore;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "pii-registry starting"
    );

    // -----------------------------------------------------------------------
    // 3. Database
    // -----------------------------------------------------------------------
    let pool = db::connect(&cfg).await?;
    if cfg.run_migrations {
        db::migrate(&pool).await?;
    }

    // -----------------------------------------------------------------------
    // 4. Person store
    // -----------------------------------------------------------------------
    let store = PgPersonStore::new(pool, cfg.encryption_passphrase.clone(), cfg.name_max_length)
        .context("failed to define encrypted person columns")?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(Arc::new(store), cfg.name_max_length);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(server::middleware::shutdown_signal())
        .await?;

    info!("pii-registry stopped");
    Ok(())
}
