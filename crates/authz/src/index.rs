//! Indexed permission edge set.
//!
//! Three views of one relation:
//!   1. `edges`    -- pair set for O(1) membership.
//!   2. `outgoing` -- subject -> objects it may see.
//!   3. `incoming` -- object -> subjects that may see it.
//!
//! Every mutation updates all three. Empty buckets are dropped so the
//! multi-maps never hold an empty set.

use std::collections::{BTreeSet, HashMap, HashSet};
use teamvis_core::{PermissionEdge, TeamId};

#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    edges: HashSet<PermissionEdge>,
    outgoing: HashMap<TeamId, HashSet<TeamId>>,
    incoming: HashMap<TeamId, HashSet<TeamId>>,
}

impl EdgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the edge was not present before.
    pub fn insert(&mut self, edge: PermissionEdge) -> bool {
        if !self.edges.insert(edge) {
            return false;
        }
        self.outgoing
            .entry(edge.subject)
            .or_default()
            .insert(edge.object);
        self.incoming
            .entry(edge.object)
            .or_default()
            .insert(edge.subject);
        true
    }

    /// Returns `true` if the edge was present.
    pub fn remove(&mut self, edge: PermissionEdge) -> bool {
        if !self.edges.remove(&edge) {
            return false;
        }
        detach(&mut self.outgoing, edge.subject, edge.object);
        detach(&mut self.incoming, edge.object, edge.subject);
        true
    }

    /// Pure membership. No closure, no self-visibility shortcut.
    #[inline]
    pub fn contains(&self, edge: PermissionEdge) -> bool {
        self.edges.contains(&edge)
    }

    /// Subjects holding an edge onto `object`.
    pub fn subjects_of(&self, object: TeamId) -> BTreeSet<TeamId> {
        self.incoming
            .get(&object)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Objects `subject` holds an edge onto.
    pub fn objects_of(&self, subject: TeamId) -> BTreeSet<TeamId> {
        self.outgoing
            .get(&subject)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sorted for stable output; callers should not rely on it.
    pub fn edges(&self) -> Vec<PermissionEdge> {
        let mut edges: Vec<PermissionEdge> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        edges
    }

    /// Every edge naming `team` as subject or object, sorted.
    pub fn edges_touching(&self, team: TeamId) -> Vec<PermissionEdge> {
        let mut touching: BTreeSet<PermissionEdge> = self
            .objects_of(team)
            .into_iter()
            .map(|object| PermissionEdge {
                subject: team,
                object,
            })
            .collect();
        touching.extend(self.subjects_of(team).into_iter().map(|subject| PermissionEdge {
            subject,
            object: team,
        }));
        touching.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// True when all three views describe the same edge set.
    pub fn is_consistent(&self) -> bool {
        let out_count: usize = self.outgoing.values().map(HashSet::len).sum();
        let in_count: usize = self.incoming.values().map(HashSet::len).sum();
        if out_count != self.edges.len() || in_count != self.edges.len() {
            return false;
        }
        if self.outgoing.values().any(HashSet::is_empty)
            || self.incoming.values().any(HashSet::is_empty)
        {
            return false;
        }
        self.edges.iter().all(|e| {
            self.outgoing
                .get(&e.subject)
                .is_some_and(|s| s.contains(&e.object))
                && self
                    .incoming
                    .get(&e.object)
                    .is_some_and(|s| s.contains(&e.subject))
        })
    }
}

impl FromIterator<PermissionEdge> for EdgeIndex {
    fn from_iter<I: IntoIterator<Item = PermissionEdge>>(iter: I) -> Self {
        let mut index = EdgeIndex::new();
        for edge in iter {
            index.insert(edge);
        }
        index
    }
}

fn detach(map: &mut HashMap<TeamId, HashSet<TeamId>>, key: TeamId, value: TeamId) {
    if let Some(bucket) = map.get_mut(&key) {
        bucket.remove(&value);
        if bucket.is_empty() {
            map.remove(&key);
        }
    }
}
