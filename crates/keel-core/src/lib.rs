//! keel-core
//!
//! Core primitives for keel:
//! - Content descriptors (digest + size + media type)
//! - The directed content graph used to model artifact collections
//! - Node variants and the visitor dispatch used by publishers
//! - Assembly limits configuration
//!
//! This crate performs no filesystem or network I/O. Higher-level crates
//! (store, CLI) perform I/O and feed nodes, edges, and descriptors into the
//! structures defined here.

pub mod config;
pub mod descriptor;
pub mod errors;
pub mod graph;

pub use crate::errors::{CoreError, CoreResult};

/// Media type assigned to plain file artifacts assembled from a workspace.
pub const MEDIA_TYPE_FILE: &str = "application/vnd.keel.file.v1";

/// Media type assigned to collection manifests.
pub const MEDIA_TYPE_COLLECTION: &str = "application/vnd.keel.collection.v1";

/// Convenience re-exports.
pub mod prelude {
    pub use crate::descriptor::{Descriptor, Digest};
    pub use crate::graph::{ArtifactNode, BuildNode, Edge, Graph, Node, NodeVisitor};
    pub use crate::{CoreError, CoreResult};
}
