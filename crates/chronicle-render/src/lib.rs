//! Chronicle rendering
//!
//! Single-document formatters are looked up by format key in a
//! [`FormatterRegistry`]. The multi-part viewer renders each slice through a
//! [`PartRenderer`] sharing one set of [`ViewerAssets`] per job.

pub mod assets;
pub mod formatter;
pub mod formatters;
pub mod html;
pub mod inline;
pub mod part;
pub mod registry;

pub use assets::ViewerAssets;
pub use formatter::ExportFormatter;
pub use formatters::{HtmlFormatter, JsonFormatter, TextFormatter};
pub use inline::{AttachmentSource, InlineImageEmbedder, LocalAttachmentSource};
pub use part::{HtmlPartRenderer, PartRenderer};
pub use registry::FormatterRegistry;
