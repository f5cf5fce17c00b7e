//! Cross-team visibility authorization: edge index, store, and report generator.

pub mod index;
pub mod report;
pub mod store;

pub use index::EdgeIndex;
pub use report::Report;
pub use store::VisibilityStore;
