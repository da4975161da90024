//! Storage abstractions for post persistence.
//!
//! The pipeline hands each completed [`PostRecord`] to a [`PostSink`] and
//! moves on; what durability means is the backend's business. The bundled
//! [`LocalStorage`] backend appends records to a JSON Lines file under a
//! storage root:
//!
//! ```text
//! storage/
//! ├── config.toml   # Crawler configuration
//! ├── posts.jsonl   # Harvested records, append-only
//! └── stats.json    # Statistics of the latest run
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CrawlStats, PostRecord};

// Re-export for convenience
pub use local::LocalStorage;

/// Identifier assigned by a sink to a persisted record.
pub type PersistedId = u64;

/// Trait for post storage backends.
///
/// `create` makes no idempotency promise: persisting the same `link` twice
/// produces two rows unless the backend enforces a uniqueness constraint.
#[async_trait]
pub trait PostSink: Send + Sync {
    /// Durably store one record.
    async fn create(&self, record: &PostRecord) -> Result<PersistedId>;

    /// Write the end-of-run statistics snapshot.
    async fn write_stats(&self, stats: &CrawlStats) -> Result<()>;
}
