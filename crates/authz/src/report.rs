//! Visibility report generator.
//!
//! Takes a snapshot of the edge set and produces a human-readable summary
//! grouped by subject team.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use teamvis_core::{PermissionEdge, TeamId};

/// Summary of one edge-set snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_edges: usize,
    pub subject_count: usize,
    pub object_count: usize,
    pub self_edges: usize,
    pub rows: Vec<VisibilityRow>,
}

/// Everything one subject team is permitted to see.
#[derive(Debug, Clone, Serialize)]
pub struct VisibilityRow {
    pub subject: TeamId,
    pub sees: Vec<TeamId>,
}

impl Report {
    pub fn build(edges: &[PermissionEdge]) -> Self {
        let mut by_subject: BTreeMap<TeamId, BTreeSet<TeamId>> = BTreeMap::new();
        let mut objects: BTreeSet<TeamId> = BTreeSet::new();
        let mut self_edges = 0usize;

        for edge in edges {
            by_subject.entry(edge.subject).or_default().insert(edge.object);
            objects.insert(edge.object);
            if edge.is_self_edge() {
                self_edges += 1;
            }
        }

        let mut rows: Vec<VisibilityRow> = by_subject
            .into_iter()
            .map(|(subject, sees)| VisibilityRow {
                subject,
                sees: sees.into_iter().collect(),
            })
            .collect();

        // Widest visibility first, then by team id.
        rows.sort_by(|a, b| {
            b.sees
                .len()
                .cmp(&a.sees.len())
                .then(a.subject.cmp(&b.subject))
        });

        let total_edges = rows.iter().map(|r| r.sees.len()).sum();

        Report {
            total_edges,
            subject_count: rows.len(),
            object_count: objects.len(),
            self_edges,
            rows,
        }
    }

    /// Render the report as a boxed text table.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                 TEAM VISIBILITY PERMISSIONS                  ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Edges:              {:>39} ║\n", self.total_edges));
        out.push_str(&format!("║  Subject teams:      {:>39} ║\n", self.subject_count));
        out.push_str(&format!("║  Object teams:       {:>39} ║\n", self.object_count));
        out.push_str(&format!("║  Self edges:         {:>39} ║\n", self.self_edges));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.rows.is_empty() {
            out.push_str("║  No permissions granted.                                     ║\n");
        } else {
            for row in &self.rows {
                let sees: Vec<String> = row.sees.iter().map(TeamId::to_string).collect();
                out.push_str(&format!(
                    "║  Team {} sees {} team(s): {}\n",
                    row.subject,
                    row.sees.len(),
                    sees.join(", ")
                ));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
