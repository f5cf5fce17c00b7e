//! Domain types for the team visibility store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Team identifier
// ---------------------------------------------------------------------------

/// Opaque team handle, assigned by the team-management collaborator.
///
/// No existence check is ever made against it; any `i64` is a valid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl From<i64> for TeamId {
    #[inline]
    fn from(id: i64) -> Self {
        TeamId(id)
    }
}

// Lets bare integer literals (which default to i32) be passed anywhere an
// `impl Into<TeamId>` is taken.
impl From<i32> for TeamId {
    #[inline]
    fn from(id: i32) -> Self {
        TeamId(i64::from(id))
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TeamId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(TeamId)
    }
}

// ---------------------------------------------------------------------------
// Permission edge
// ---------------------------------------------------------------------------

/// `subject` may view `object`'s detailed statistics.
///
/// Presence is the only state. Absence means forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionEdge {
    pub subject: TeamId,
    pub object: TeamId,
}

impl PermissionEdge {
    #[inline]
    pub fn new(subject: impl Into<TeamId>, object: impl Into<TeamId>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
        }
    }

    /// Stored like any other edge; only reporting looks at this.
    #[inline]
    pub fn is_self_edge(&self) -> bool {
        self.subject == self.object
    }
}

impl fmt::Display for PermissionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.subject, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_id_parses_and_displays() {
        let id: TeamId = " 42 ".parse().unwrap();
        assert_eq!(id, TeamId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<TeamId>().is_err());
        assert_eq!("-7".parse::<TeamId>().unwrap(), TeamId(-7));
    }

    #[test]
    fn edge_serializes_as_flat_integers() {
        let edge = PermissionEdge::new(1, 2);
        let json = serde_json::to_string(&edge).unwrap();
        assert_eq!(json, r#"{"subject":1,"object":2}"#);
        let back: PermissionEdge = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edge);
    }

    #[test]
    fn self_edge_detection() {
        assert!(PermissionEdge::new(3, 3).is_self_edge());
        assert!(!PermissionEdge::new(3, 4).is_self_edge());
    }
}
