//! The content-addressable target contract.
//!
//! Descriptors (digest + size + media type) are the opaque, comparable keys
//! for every operation. Content moves as async byte streams so large blobs
//! never need to be resident; the `*_bytes` helpers exist for small objects
//! and tests.
//!
//! Cancellation is the caller's concern: targets forward whatever deadline or
//! cancellation semantics their underlying I/O offers, and impose none.

use std::io::Cursor;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use keel_core::descriptor::Descriptor;

use crate::errors::StoreResult;

/// A readable content stream handed out by `fetch`.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A content-addressable store endpoint.
#[async_trait]
pub trait Target: Send + Sync {
    /// Whether the store holds content for the descriptor.
    async fn exists(&self, desc: &Descriptor) -> StoreResult<bool>;

    /// Open a readable stream for the descriptor's content.
    async fn fetch(&self, desc: &Descriptor) -> StoreResult<ByteStream>;

    /// Store the stream's content under the descriptor.
    async fn push(&self, desc: &Descriptor, content: ByteStream) -> StoreResult<()>;

    /// Resolve a tag to the descriptor it points at.
    async fn resolve(&self, tag: &str) -> StoreResult<Descriptor>;

    /// Fetch and buffer the full content. Intended for small objects.
    async fn fetch_bytes(&self, desc: &Descriptor) -> StoreResult<Bytes> {
        let mut stream = self.fetch(desc).await?;
        let mut buf = Vec::with_capacity(desc.size as usize);
        stream.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Push an in-memory buffer.
    async fn push_bytes(&self, desc: &Descriptor, content: Bytes) -> StoreResult<()> {
        self.push(desc, Box::pin(Cursor::new(content))).await
    }
}
