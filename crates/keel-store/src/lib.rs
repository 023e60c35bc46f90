//! keel-store
//!
//! Content-addressable storage targets for keel:
//! - the `Target` trait: exists / fetch / push / resolve over byte streams
//! - `MemoryTarget`: in-memory store (tests, ephemeral runs)
//! - `FsTarget`: filesystem CAS used as the local cache store
//! - `HttpTarget` (feature `http`): thin HTTP marshalling of the contract
//! - `CachedTarget`: the fetch-through cache in front of a remote target
//!
//! Pushes verify content against the descriptor digest before committing, so
//! a store never holds an object whose bytes do not match its key.

pub mod cache;
pub mod errors;
pub mod fs;
pub mod memory;
pub mod target;

#[cfg(feature = "http")]
pub mod http;

pub use crate::cache::{CachedFetch, CachedTarget};
pub use crate::errors::{StoreError, StoreResult};
pub use crate::fs::FsTarget;
pub use crate::memory::MemoryTarget;
pub use crate::target::{ByteStream, Target};

#[cfg(feature = "http")]
pub use crate::http::HttpTarget;
