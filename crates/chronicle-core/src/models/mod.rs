pub mod job;
pub mod manifest;
pub mod message;
pub mod options;
pub mod payload;

pub use job::{ExportJob, ExportStatus};
pub use manifest::{ViewerManifest, ViewerManifestPart};
pub use message::{slice_bounds, ExportMessage};
pub use options::ExportExtraOptions;
pub use payload::{ExportPayload, PartInfo, PayloadContext};
