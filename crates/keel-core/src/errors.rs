//! Error types for keel-core.
//!
//! Graph mutation errors are always returned synchronously to the caller;
//! no partial mutation is retried or auto-corrected. `MultipleRoots` carries
//! the offending node ids in sorted order so diagnostics are reproducible.

use thiserror::Error;

/// Result alias used across keel-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by keel-core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node with the same id is already present in the graph.
    #[error("node id already exists in graph: {id}")]
    NodeCollision { id: String },

    /// An edge from a node to itself was rejected.
    #[error("self-edge rejected for node: {id}")]
    SelfEdge { id: String },

    /// An edge endpoint references a node id absent from the graph.
    #[error("edge references unknown node id: {id}")]
    DanglingEdge { id: String },

    /// Root computation found no node with zero in-degree.
    #[error("graph has no root node")]
    NoRoot,

    /// Root computation found more than one node with zero in-degree.
    /// Ids are sorted lexicographically.
    #[error("graph has multiple root candidates: {}", ids.join(", "))]
    MultipleRoots { ids: Vec<String> },

    /// A caller-supplied value was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant did not hold.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl CoreError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        CoreError::Invariant(msg.into())
    }
}
