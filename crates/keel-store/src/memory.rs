//! In-memory content-addressable target.
//!
//! Digest-keyed map behind `parking_lot::RwLock`. Clones share the same
//! underlying storage, which makes this the natural test double and the
//! default cache store for ephemeral runs.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::io::AsyncReadExt;

use keel_core::descriptor::{Descriptor, Digest};

use crate::errors::{StoreError, StoreResult};
use crate::target::{ByteStream, Target};

/// An in-memory target. Cheap to clone; clones share storage.
#[derive(Clone, Default)]
pub struct MemoryTarget {
    blobs: Arc<RwLock<HashMap<Digest, Bytes>>>,
    tags: Arc<RwLock<HashMap<String, Descriptor>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes and return the descriptor they are addressable under.
    pub fn insert(&self, media_type: &str, bytes: impl Into<Bytes>) -> Descriptor {
        let bytes = bytes.into();
        let desc = Descriptor::from_bytes(media_type, &bytes);
        self.blobs.write().insert(desc.digest.clone(), bytes);
        desc
    }

    /// Point a tag at a descriptor.
    pub fn tag(&self, name: impl Into<String>, desc: Descriptor) {
        self.tags.write().insert(name.into(), desc);
    }
}

#[async_trait]
impl Target for MemoryTarget {
    async fn exists(&self, desc: &Descriptor) -> StoreResult<bool> {
        Ok(self.blobs.read().contains_key(&desc.digest))
    }

    async fn fetch(&self, desc: &Descriptor) -> StoreResult<ByteStream> {
        let bytes = self
            .blobs
            .read()
            .get(&desc.digest)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                digest: desc.digest.clone(),
            })?;
        Ok(Box::pin(Cursor::new(bytes)))
    }

    async fn push(&self, desc: &Descriptor, mut content: ByteStream) -> StoreResult<()> {
        let mut buf = Vec::with_capacity(desc.size as usize);
        content.read_to_end(&mut buf).await?;

        if buf.len() as u64 != desc.size {
            return Err(StoreError::SizeMismatch {
                expected: desc.size,
                actual: buf.len() as u64,
            });
        }
        let actual = Digest::from_bytes(&buf);
        if actual != desc.digest {
            return Err(StoreError::DigestMismatch {
                expected: desc.digest.clone(),
                actual,
            });
        }

        self.blobs
            .write()
            .insert(desc.digest.clone(), Bytes::from(buf));
        Ok(())
    }

    async fn resolve(&self, tag: &str) -> StoreResult<Descriptor> {
        self.tags
            .read()
            .get(tag)
            .cloned()
            .ok_or_else(|| StoreError::TagNotFound {
                tag: tag.to_string(),
            })
    }
}
