//! Configuration module
//!
//! This module provides the process configuration for the exporter and the
//! slice/concurrency bounds every job's extra options are clamped into.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_EXPORT_CONCURRENCY, DEFAULT_EXPORT_SLICE_LIMIT, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_STORAGE_DIR, MAX_EXPORT_CONCURRENCY, MAX_EXPORT_SLICE_LIMIT, MIN_EXPORT_SLICE_LIMIT,
};

const DB_MAX_CONNECTIONS: u32 = 5;
const DB_TIMEOUT_SECS: u64 = 30;
const STALE_EXPORT_REAP_INTERVAL_SECS: u64 = 60;
const STALE_EXPORT_TIMEOUT_SECS: i64 = 3600;

/// Bounds applied to the per-job slice size and render concurrency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportLimits {
    pub default_slice_limit: usize,
    pub min_slice_limit: usize,
    pub max_slice_limit: usize,
    pub default_concurrency: usize,
    pub max_concurrency: usize,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            default_slice_limit: DEFAULT_EXPORT_SLICE_LIMIT,
            min_slice_limit: MIN_EXPORT_SLICE_LIMIT,
            max_slice_limit: MAX_EXPORT_SLICE_LIMIT,
            default_concurrency: DEFAULT_EXPORT_CONCURRENCY,
            max_concurrency: MAX_EXPORT_CONCURRENCY,
        }
    }
}

impl ExportLimits {
    /// Zero or negative means "use the default"; anything else is clamped into `[min, max]`.
    pub fn normalize_slice_limit(&self, requested: i64) -> usize {
        let limit = if requested <= 0 {
            self.default_slice_limit
        } else {
            usize::try_from(requested).unwrap_or(usize::MAX)
        };
        limit.clamp(self.min_slice_limit.max(1), self.max_slice_limit.max(1))
    }

    /// Always at least 1.
    pub fn normalize_concurrency(&self, requested: i64) -> usize {
        let value = if requested <= 0 {
            self.default_concurrency
        } else {
            usize::try_from(requested).unwrap_or(usize::MAX)
        };
        value.min(self.max_concurrency).max(1)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.min_slice_limit == 0 {
            anyhow::bail!("EXPORT_SLICE_LIMIT_MIN must be at least 1");
        }
        if self.min_slice_limit > self.max_slice_limit {
            anyhow::bail!(
                "EXPORT_SLICE_LIMIT_MIN ({}) exceeds EXPORT_SLICE_LIMIT_MAX ({})",
                self.min_slice_limit,
                self.max_slice_limit
            );
        }
        if !(self.min_slice_limit..=self.max_slice_limit).contains(&self.default_slice_limit) {
            anyhow::bail!(
                "EXPORT_SLICE_LIMIT_DEFAULT ({}) must lie within [{}, {}]",
                self.default_slice_limit,
                self.min_slice_limit,
                self.max_slice_limit
            );
        }
        if self.max_concurrency == 0 {
            anyhow::bail!("EXPORT_CONCURRENCY_MAX must be at least 1");
        }
        Ok(())
    }
}

/// Exporter process configuration
#[derive(Clone, Debug)]
pub struct ExporterConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Directory finished exports are written to.
    pub storage_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub limits: ExportLimits,
    /// Interval in seconds between stale job sweeps. 0 = disabled.
    pub stale_job_reap_interval_secs: u64,
    /// Jobs in `processing` for longer than this are failed by the sweep.
    pub stale_job_timeout_secs: i64,
    pub inline_images: bool,
    /// Root of locally stored attachments, used for inlining images.
    pub attachment_dir: Option<PathBuf>,
    /// Directory with `viewer.css` / `viewer.js` overriding the built-in viewer assets.
    pub viewer_assets_dir: Option<PathBuf>,
    pub environment: String,
}

impl ExporterConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let limits = ExportLimits {
            default_slice_limit: env_or("EXPORT_SLICE_LIMIT_DEFAULT", DEFAULT_EXPORT_SLICE_LIMIT),
            min_slice_limit: env_or("EXPORT_SLICE_LIMIT_MIN", MIN_EXPORT_SLICE_LIMIT),
            max_slice_limit: env_or("EXPORT_SLICE_LIMIT_MAX", MAX_EXPORT_SLICE_LIMIT),
            default_concurrency: env_or("EXPORT_CONCURRENCY_DEFAULT", DEFAULT_EXPORT_CONCURRENCY),
            max_concurrency: env_or("EXPORT_CONCURRENCY_MAX", MAX_EXPORT_CONCURRENCY),
        };

        let config = Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            storage_dir: env::var("EXPORT_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR)),
            poll_interval_ms: env_or("EXPORT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            limits,
            stale_job_reap_interval_secs: env_or(
                "STALE_EXPORT_REAP_INTERVAL_SECS",
                STALE_EXPORT_REAP_INTERVAL_SECS,
            ),
            stale_job_timeout_secs: env_or("STALE_EXPORT_TIMEOUT_SECS", STALE_EXPORT_TIMEOUT_SECS),
            inline_images: env::var("EXPORT_INLINE_IMAGES")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            attachment_dir: env::var("ATTACHMENT_STORAGE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            viewer_assets_dir: env::var("VIEWER_ASSETS_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("EXPORT_POLL_INTERVAL_MS must be greater than 0");
        }
        if self.stale_job_reap_interval_secs > 0 && self.stale_job_timeout_secs <= 0 {
            anyhow::bail!("STALE_EXPORT_TIMEOUT_SECS must be positive when the reaper is enabled");
        }
        self.limits.validate()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn env_or<T: std::str::FromStr + ToString>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}
