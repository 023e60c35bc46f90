//! Error types for keel-store.
//!
//! Cache-side failures during reads are downgraded to misses by the
//! fetch-through cache; `CachePopulation` is the one cache failure that is
//! surfaced, and only at stream-close time.

use thiserror::Error;

use keel_core::descriptor::Digest;

/// Result alias used across keel-store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by storage targets and the fetch-through cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store holds no object for the descriptor.
    #[error("object not found: {digest}")]
    NotFound { digest: Digest },

    /// A tag does not resolve to a descriptor.
    #[error("tag not found: {tag}")]
    TagNotFound { tag: String },

    /// A tag name the store cannot represent.
    #[error("invalid tag name: {tag}")]
    InvalidTag { tag: String },

    /// Pushed content did not hash to the descriptor digest.
    #[error("content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: Digest, actual: Digest },

    /// Pushed content size did not match the descriptor size.
    #[error("content size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Underlying I/O failure.
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    /// Remote transport failure.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// Background cache population failed during a fetch. Discovered and
    /// returned when the fetched stream is closed, never silently swallowed.
    #[error("cache population failed")]
    CachePopulation(#[source] Box<StoreError>),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        StoreError::Transport {
            message: message.into(),
        }
    }

    /// Whether this error means "the object is simply absent".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::TagNotFound { .. }
        )
    }
}
