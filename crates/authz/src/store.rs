//! The visibility authorization store.
//!
//! Wraps an [`EdgeIndex`] in a reader/writer lock and writes every mutation
//! through a [`StorageAdapter`] before applying it to the index:
//!
//! ```ignore
//! let store = VisibilityStore::open(Arc::new(JournalAdapter::new(path)?)).await?;
//! store.grant(1, 2).await?;
//! assert!(store.is_permitted(1, 2).await);
//! ```
//!
//! Each mutation runs as its own task holding an owned write guard across
//! the adapter call and the index update. Dropping the caller's future only
//! detaches it from the result, so storage and index always move together
//! and durable order equals in-memory order.

use crate::index::EdgeIndex;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use teamvis_core::{PermissionEdge, TeamId, VisResult, VisibilityError};
use teamvis_storage::StorageAdapter;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

type IndexGuard = OwnedRwLockWriteGuard<EdgeIndex>;

/// Shared handle to the edge set. Cloning is cheap and every clone sees
/// the same state.
#[derive(Clone)]
pub struct VisibilityStore {
    index: Arc<RwLock<EdgeIndex>>,
    adapter: Arc<dyn StorageAdapter>,
}

impl VisibilityStore {
    /// Loads the persisted edge set from `adapter`.
    pub async fn open(adapter: Arc<dyn StorageAdapter>) -> VisResult<Self> {
        let edges = adapter.load().await?;
        let index: EdgeIndex = edges.into_iter().collect();

        tracing::info!(edges = index.len(), "visibility store opened");

        Ok(Self {
            index: Arc::new(RwLock::new(index)),
            adapter,
        })
    }

    /// Runs `op` with exclusive access on a task of its own.
    ///
    /// Waiting for the lock is cancellable; once acquired, the spawned task
    /// finishes `op` even if the caller goes away.
    async fn exclusive<T, F, Fut>(&self, op: F) -> VisResult<T>
    where
        F: FnOnce(IndexGuard, Arc<dyn StorageAdapter>) -> Fut,
        Fut: Future<Output = VisResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.index).write_owned().await;
        let task = tokio::spawn(op(guard, Arc::clone(&self.adapter)));
        task.await
            .map_err(|e| VisibilityError::Internal(format!("store mutation task failed: {e}")))?
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Lets `subject` view `object`'s statistics. No-op if already granted.
    pub async fn grant(
        &self,
        subject: impl Into<TeamId>,
        object: impl Into<TeamId>,
    ) -> VisResult<()> {
        let edge = PermissionEdge::new(subject, object);
        self.exclusive(move |mut index, adapter| async move {
            if index.contains(edge) {
                tracing::debug!(%edge, "grant: already present");
                return Ok(());
            }

            adapter.insert(edge).await.inspect_err(|e| {
                tracing::warn!(%edge, error = %e, "grant not persisted");
            })?;
            index.insert(edge);
            debug_assert!(index.is_consistent());

            tracing::debug!(%edge, edges = index.len(), "granted");
            Ok(())
        })
        .await
    }

    /// Withdraws a grant. No-op if there is none.
    pub async fn revoke(
        &self,
        subject: impl Into<TeamId>,
        object: impl Into<TeamId>,
    ) -> VisResult<()> {
        let edge = PermissionEdge::new(subject, object);
        self.exclusive(move |mut index, adapter| async move {
            if !index.contains(edge) {
                tracing::debug!(%edge, "revoke: not present");
                return Ok(());
            }

            adapter.remove(edge).await.inspect_err(|e| {
                tracing::warn!(%edge, error = %e, "revoke not persisted");
            })?;
            index.remove(edge);
            debug_assert!(index.is_consistent());

            tracing::debug!(%edge, edges = index.len(), "revoked");
            Ok(())
        })
        .await
    }

    /// Removes every edge naming `team` as subject or object.
    ///
    /// Orphan cleanup for the team-management side to call after deleting a
    /// team; never run implicitly. Edges are revoked one by one, so on a
    /// storage failure the edges already removed stay removed and the rest
    /// stay granted.
    pub async fn purge_team(&self, team: impl Into<TeamId>) -> VisResult<Vec<PermissionEdge>> {
        let team = team.into();
        self.exclusive(move |mut index, adapter| async move {
            let touching = index.edges_touching(team);

            let mut removed = Vec::with_capacity(touching.len());
            for edge in touching {
                adapter.remove(edge).await.inspect_err(|e| {
                    tracing::warn!(%team, %edge, removed = removed.len(), error = %e, "purge interrupted");
                })?;
                index.remove(edge);
                removed.push(edge);
            }

            tracing::info!(%team, removed = removed.len(), "team purged");
            Ok(removed)
        })
        .await
    }

    /// Rewrites persisted state as exactly the live edge set.
    pub async fn compact(&self) -> VisResult<usize> {
        // Exclusive so no mutation lands between the snapshot and the rewrite.
        self.exclusive(|index, adapter| async move {
            let edges = index.edges();
            adapter.compact(&edges).await?;

            tracing::info!(edges = edges.len(), "store compacted");
            Ok(edges.len())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The decision function: true iff the edge `(subject, object)` exists.
    ///
    /// Plain membership. A team is not implicitly permitted to see itself and
    /// no edge is inferred from a chain of others.
    pub async fn is_permitted(&self, subject: impl Into<TeamId>, object: impl Into<TeamId>) -> bool {
        let edge = PermissionEdge::new(subject, object);
        self.index.read().await.contains(edge)
    }

    /// Snapshot of every edge. Order is unspecified.
    pub async fn all_permissions(&self) -> Vec<PermissionEdge> {
        self.index.read().await.edges()
    }

    /// Teams permitted to view `object`.
    pub async fn teams_that_can_see(&self, object: impl Into<TeamId>) -> BTreeSet<TeamId> {
        self.index.read().await.subjects_of(object.into())
    }

    /// Teams `subject` is permitted to view.
    pub async fn teams_that_it_sees(&self, subject: impl Into<TeamId>) -> BTreeSet<TeamId> {
        self.index.read().await.objects_of(subject.into())
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    #[cfg(test)]
    async fn is_consistent(&self) -> bool {
        self.index.read().await.is_consistent()
    }
}

impl fmt::Debug for VisibilityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamvis_storage::MemoryAdapter;

    fn ids(v: &[i64]) -> BTreeSet<TeamId> {
        v.iter().copied().map(TeamId).collect()
    }

    async fn empty_store() -> (VisibilityStore, MemoryAdapter) {
        let adapter = MemoryAdapter::new();
        let store = VisibilityStore::open(Arc::new(adapter.clone())).await.unwrap();
        (store, adapter)
    }

    #[tokio::test]
    async fn grant_is_directional() {
        let (store, _) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        assert!(store.is_permitted(1, 2).await);
        assert!(!store.is_permitted(2, 1).await);
    }

    #[tokio::test]
    async fn teams_that_it_sees_lists_objects() {
        let (store, _) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(1, 3).await.unwrap();
        assert_eq!(store.teams_that_it_sees(1).await, ids(&[2, 3]));
    }

    #[tokio::test]
    async fn teams_that_can_see_lists_subjects() {
        let (store, _) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(3, 2).await.unwrap();
        assert_eq!(store.teams_that_can_see(2).await, ids(&[1, 3]));
    }

    #[tokio::test]
    async fn revoke_removes_edge_from_listing() {
        let (store, adapter) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.revoke(1, 2).await.unwrap();
        assert!(!store.is_permitted(1, 2).await);
        assert!(!store
            .all_permissions()
            .await
            .contains(&PermissionEdge::new(1, 2)));
        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn revoke_on_empty_store_is_noop() {
        let (store, adapter) = empty_store().await;
        store.revoke(5, 9).await.unwrap();
        assert!(store.is_empty().await);
        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn not_transitive() {
        let (store, _) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(2, 3).await.unwrap();
        assert!(!store.is_permitted(1, 3).await);
    }

    #[tokio::test]
    async fn no_implicit_self_visibility() {
        let (store, _) = empty_store().await;
        store.grant(4, 5).await.unwrap();
        assert!(!store.is_permitted(4, 4).await);
        store.grant(4, 4).await.unwrap();
        assert!(store.is_permitted(4, 4).await);
    }

    #[tokio::test]
    async fn double_grant_and_double_revoke() {
        let (store, adapter) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(1, 2).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(adapter.len(), 1);

        store.revoke(1, 2).await.unwrap();
        store.revoke(1, 2).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.is_consistent().await);
    }

    #[tokio::test]
    async fn open_loads_persisted_edges() {
        let adapter = MemoryAdapter::with_edges([PermissionEdge::new(1, 2), PermissionEdge::new(3, 2)]);
        let store = VisibilityStore::open(Arc::new(adapter)).await.unwrap();
        assert_eq!(store.teams_that_can_see(2).await, ids(&[1, 3]));
        assert!(store.is_consistent().await);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let (store, _) = empty_store().await;
        let other = store.clone();
        store.grant(8, 9).await.unwrap();
        assert!(other.is_permitted(8, 9).await);
    }

    #[tokio::test]
    async fn purge_team_removes_both_directions() {
        let (store, adapter) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(2, 3).await.unwrap();
        store.grant(4, 5).await.unwrap();

        let removed = store.purge_team(2).await.unwrap();
        assert_eq!(removed, vec![PermissionEdge::new(1, 2), PermissionEdge::new(2, 3)]);
        assert_eq!(store.all_permissions().await, vec![PermissionEdge::new(4, 5)]);
        assert_eq!(adapter.len(), 1);
        assert!(store.is_consistent().await);
    }

    #[tokio::test]
    async fn purge_unknown_team_is_noop() {
        let (store, _) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        assert!(store.purge_team(99).await.unwrap().is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn compact_pushes_live_set_to_adapter() {
        let (store, adapter) = empty_store().await;
        store.grant(1, 2).await.unwrap();
        store.grant(2, 1).await.unwrap();
        assert_eq!(store.compact().await.unwrap(), 2);
        assert_eq!(adapter.len(), 2);
    }
}
