//! Error types for keel-registry.

use thiserror::Error;

/// Result alias used across keel-registry.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by registry configuration and mirror resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A match pattern could not be compiled. Resolution aborts for the
    /// whole call rather than skipping the bad rule silently.
    #[error("malformed registry match pattern {pattern:?}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A configuration file could not be read.
    #[error("failed to read registry config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse registry config {path}: {message}")]
    Parse { path: String, message: String },

    /// The config file extension is not a supported format.
    #[error("unsupported registry config format: {path}")]
    UnsupportedFormat { path: String },
}
