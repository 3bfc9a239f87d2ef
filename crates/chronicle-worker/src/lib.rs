//! Chronicle export worker
//!
//! Claims export jobs from a [`chronicle_db::JobStore`] and turns them into
//! files: single documents through the formatter registry, or multi-part
//! HTML viewer archives rendered in parallel and packaged as a zip.

pub mod archive;
pub mod chunk;
pub mod config;
pub mod context;
pub mod document;
pub mod executor;
pub mod part;
pub mod processor;
pub mod scheduler;
pub mod viewer;

pub use chunk::{split_into_chunks, split_messages};
pub use config::WorkerConfig;
pub use context::ExportContext;
pub use executor::BoundedExecutor;
pub use part::{PartRenderContext, PartRenderResult};
pub use processor::{CompletedExport, ExportProcessor};
pub use scheduler::{stale_job_message, ExportScheduler};
