//! Centralized error types for the teamvis workspace.

use thiserror::Error;

/// Top-level error enum.
///
/// The store operations only ever surface `Unavailable`, `Corrupt` or
/// `Internal`. `InvalidInput` belongs to the configuration boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VisibilityError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt storage: {0}")]
    Corrupt(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisibilityError {
    /// True for failures a caller may retry once storage comes back.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, VisibilityError::Unavailable(_))
    }
}

pub type VisResult<T> = Result<T, VisibilityError>;
