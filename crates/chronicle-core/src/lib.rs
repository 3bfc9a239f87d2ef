//! Chronicle Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! file-naming rules shared by every Chronicle component: the job store,
//! the renderers and the export worker.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::{ExportLimits, ExporterConfig};
pub use error::ExportError;
pub use models::{
    ExportExtraOptions, ExportJob, ExportMessage, ExportPayload, ExportStatus, PartInfo,
    PayloadContext, ViewerManifest, ViewerManifestPart,
};
