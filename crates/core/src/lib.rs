//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{VisResult, VisibilityError};
pub use types::{PermissionEdge, TeamId};
