//! Chronicle persistence collaborators.
//!
//! - [`JobStore`]: durable export jobs with a conditional-update claim
//! - [`MessageSource`] / [`ChannelDirectory`]: read-only access to chat data
//!
//! Each comes with a PostgreSQL implementation and an in-memory one used by
//! tests and local tooling.

pub mod memory;
pub mod postgres;
pub mod source;
pub mod store;

pub use memory::{MemoryChannelDirectory, MemoryJobStore, MemoryMessageSource};
pub use postgres::{PgChannelDirectory, PgJobStore, PgMessageSource};
pub use source::{resolve_channel_name, ChannelDirectory, MessageSource};
pub use store::JobStore;
