//! Storage abstraction and persistence adapters for teamvis.

pub mod journal;
pub mod memory;

use async_trait::async_trait;
use teamvis_core::{PermissionEdge, VisResult};

pub use journal::JournalAdapter;
pub use memory::MemoryAdapter;

/// Durable backing for the permission edge set.
///
/// Callers serialize writes; an adapter only has to apply them in the order
/// received. Any failure to reach the backing medium is reported as
/// [`VisibilityError::Unavailable`](teamvis_core::VisibilityError::Unavailable).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Every persisted edge, deduplicated.
    async fn load(&self) -> VisResult<Vec<PermissionEdge>>;

    async fn insert(&self, edge: PermissionEdge) -> VisResult<()>;

    async fn remove(&self, edge: PermissionEdge) -> VisResult<()>;

    /// Replace the persisted form with exactly `edges`.
    async fn compact(&self, _edges: &[PermissionEdge]) -> VisResult<()> {
        Ok(())
    }
}
