//! Process setup: configuration, telemetry, database and export services.

pub mod database;
pub mod services;

use anyhow::{Context, Result};
use chronicle_core::ExporterConfig;
use chronicle_infra::TelemetryConfig;

/// Load and validate configuration, then install tracing.
pub fn initialize(service_name: &str) -> Result<ExporterConfig> {
    let config = ExporterConfig::from_env().context("Configuration validation failed")?;

    chronicle_infra::init_telemetry(&TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
        &config.environment,
    ))?;

    tracing::info!(
        storage_dir = %config.storage_dir.display(),
        poll_interval_ms = config.poll_interval_ms,
        production = config.is_production(),
        "Configuration loaded and validated successfully"
    );
    Ok(config)
}
