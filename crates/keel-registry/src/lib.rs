//! keel-registry
//!
//! Registry endpoint configuration and mirror resolution:
//! - `Registry` / `RegistryConfig` serde models with YAML/JSON loading
//! - `find_registry`: longest-wildcard-prefix endpoint selection
//!
//! The resolver is a pure function over immutable input: no locking, safe
//! for unrestricted concurrent use. Nothing here performs network I/O.

pub mod config;
pub mod errors;
pub mod mirror;

pub use crate::config::{Registry, RegistryConfig};
pub use crate::errors::{RegistryError, RegistryResult};
pub use crate::mirror::find_registry;
