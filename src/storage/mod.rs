//! Storage abstractions for snapshot persistence.
//!
//! The store is a single slot holding the last snapshot for which a notify
//! decision was made. There is no history and no locking; runs are expected
//! to be serialized by the scheduler.
//!
//! ## Backends
//!
//! ```text
//! LocalStateStore   state.json           (default)
//! MemoryStateStore  in-process           (tests, dry runs)
//! S3StateStore      s3://bucket/key      (feature "s3")
//! ```

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Snapshot;

// Re-export for convenience
pub use local::LocalStateStore;
pub use memory::MemoryStateStore;
#[cfg(feature = "s3")]
pub use s3::S3StateStore;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted snapshot. `None` before the first save.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Overwrite the persisted snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location for log lines.
    fn location(&self) -> String;
}
