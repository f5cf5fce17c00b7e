//! In-process adapter with a shared table.
//!
//! Clones share one table, so a store reopened over a clone sees every
//! write made through the original.

use crate::StorageAdapter;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use teamvis_core::{PermissionEdge, VisResult, VisibilityError};

#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    table: Arc<Mutex<BTreeSet<PermissionEdge>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table, e.g. to simulate rows written by another process.
    pub fn with_edges(edges: impl IntoIterator<Item = PermissionEdge>) -> Self {
        Self {
            table: Arc::new(Mutex::new(edges.into_iter().collect())),
        }
    }

    pub fn len(&self) -> usize {
        // A panic elsewhere cannot leave a BTreeSet half-updated, so the
        // poisoned contents are still accurate.
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> VisResult<MutexGuard<'_, BTreeSet<PermissionEdge>>> {
        self.table
            .lock()
            .map_err(|e| VisibilityError::Internal(format!("memory table poisoned: {e}")))
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn load(&self) -> VisResult<Vec<PermissionEdge>> {
        Ok(self.table()?.iter().copied().collect())
    }

    async fn insert(&self, edge: PermissionEdge) -> VisResult<()> {
        self.table()?.insert(edge);
        Ok(())
    }

    async fn remove(&self, edge: PermissionEdge) -> VisResult<()> {
        self.table()?.remove(&edge);
        Ok(())
    }

    async fn compact(&self, edges: &[PermissionEdge]) -> VisResult<()> {
        let mut table = self.table()?;
        table.clear();
        table.extend(edges.iter().copied());
        Ok(())
    }
}
