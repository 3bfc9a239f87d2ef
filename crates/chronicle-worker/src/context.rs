//! Collaborators the export worker needs to process a job.

use std::sync::Arc;

use chronicle_db::{ChannelDirectory, JobStore, MessageSource};
use chronicle_render::{AttachmentSource, FormatterRegistry, HtmlPartRenderer, PartRenderer};

/// Shared by the scheduler loop and every job it processes.
#[derive(Clone)]
pub struct ExportContext {
    pub store: Arc<dyn JobStore>,
    pub messages: Arc<dyn MessageSource>,
    pub channels: Arc<dyn ChannelDirectory>,
    pub formatters: FormatterRegistry,
    pub part_renderer: Arc<dyn PartRenderer>,
    /// Source for inline images; `None` leaves attachment references untouched.
    pub attachments: Option<Arc<dyn AttachmentSource>>,
}

impl ExportContext {
    pub fn new(
        store: Arc<dyn JobStore>,
        messages: Arc<dyn MessageSource>,
        channels: Arc<dyn ChannelDirectory>,
        formatters: FormatterRegistry,
    ) -> Self {
        Self {
            store,
            messages,
            channels,
            formatters,
            part_renderer: Arc::new(HtmlPartRenderer),
            attachments: None,
        }
    }

    pub fn with_part_renderer(mut self, renderer: Arc<dyn PartRenderer>) -> Self {
        self.part_renderer = renderer;
        self
    }

    pub fn with_attachments(mut self, source: Arc<dyn AttachmentSource>) -> Self {
        self.attachments = Some(source);
        self
    }
}
