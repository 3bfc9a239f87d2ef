//! Chronicle exporter: background worker turning export jobs into files.
//!
//! Configuration comes from the environment (see `ExporterConfig::from_env`).
//! Without a subcommand the process runs the scheduler until Ctrl-C.

mod setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use chronicle_db::{JobStore, PgJobStore};
use chronicle_worker::{stale_job_message, ExportScheduler, WorkerConfig};

#[derive(Parser)]
#[command(name = "chronicle-exporter", about = "Chronicle channel export worker", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the export scheduler until interrupted (default)
    Run,
    /// Queue an export job
    Enqueue {
        /// Channel to export
        #[arg(long)]
        channel: String,
        /// Format key: html (viewer archive), txt, json, html-page
        #[arg(long, default_value = "html")]
        format: String,
        /// Messages per viewer part
        #[arg(long)]
        slice_limit: Option<i64>,
        /// Parts rendered in parallel
        #[arg(long)]
        max_concurrency: Option<i64>,
    },
    /// Show an export job
    Status {
        /// Job UUID
        id: Uuid,
    },
    /// Fail jobs stuck in processing longer than the configured timeout
    Reap,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = setup::initialize("chronicle-exporter")?;
    let pool = setup::database::setup_database(&config).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let context = setup::services::build_export_context(&config, pool).await?;
            let scheduler = ExportScheduler::new(Arc::new(context));
            scheduler.start(WorkerConfig::from(&config));

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
            scheduler.shutdown().await;
        }
        Commands::Enqueue {
            channel,
            format,
            slice_limit,
            max_concurrency,
        } => {
            let mut extra = serde_json::Map::new();
            if let Some(limit) = slice_limit {
                extra.insert("slice_limit".to_string(), json!(limit));
            }
            if let Some(concurrency) = max_concurrency {
                extra.insert("max_concurrency".to_string(), json!(concurrency));
            }
            let extra = (!extra.is_empty()).then_some(serde_json::Value::Object(extra));

            let job = PgJobStore::new(pool).enqueue(&channel, &format, extra).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Status { id } => {
            let job = PgJobStore::new(pool)
                .get(id)
                .await?
                .with_context(|| format!("Export job {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Reap => {
            let reaped = PgJobStore::new(pool)
                .reap_stale_processing(
                    chrono::Duration::seconds(config.stale_job_timeout_secs),
                    &stale_job_message(config.stale_job_timeout_secs),
                )
                .await?;
            println!("Reaped {} stale export job(s)", reaped);
        }
    }

    chronicle_infra::shutdown_telemetry().await;
    Ok(())
}
