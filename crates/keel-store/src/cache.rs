//! Fetch-through cache over a remote target.
//!
//! `CachedTarget` pairs a remote store with a local cache store. Reads prefer
//! the cache; a miss streams from the remote while mirroring every byte into
//! a bounded in-memory pipe drained by a single background task that pushes
//! the content into the cache. The consumer starts reading immediately and
//! never waits for the cache write, except at close.
//!
//! Pipe discipline:
//! - capacity is fixed (`PIPE_CAPACITY`); the mirror write blocks when the
//!   drain task falls behind, which in turn stalls the remote read; the
//!   backpressure chain of the design
//! - bytes are mirrored into the pipe before they are handed to the consumer,
//!   so both sides observe identical content
//! - `close()` stops the remote read, shuts the pipe, then awaits the drain
//!   task, returning its failure as `CachePopulation` even when every
//!   foreground read succeeded
//!
//! Cache failures on the read path are downgraded to misses: the cache is a
//! performance layer, never a correctness dependency. A mid-stream pipe
//! failure therefore abandons mirroring and keeps serving the remote bytes;
//! whatever the drain task reports is still surfaced at close. Closing before
//! EOF can hand the cache a truncated prefix; store-side verification then
//! fails the push, and close reports it.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use keel_core::descriptor::Descriptor;

use crate::errors::{StoreError, StoreResult};
use crate::target::{ByteStream, Target};

/// Pipe capacity between the foreground mirror and the drain task.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Read chunk size against the remote stream.
const READ_CHUNK: usize = 16 * 1024;

/// A remote target fronted by a local cache target.
///
/// Stateless orchestration: holds nothing beyond the two collaborators.
#[derive(Clone)]
pub struct CachedTarget {
    remote: Arc<dyn Target>,
    cache: Arc<dyn Target>,
}

impl CachedTarget {
    pub fn new(remote: Arc<dyn Target>, cache: Arc<dyn Target>) -> Self {
        Self { remote, cache }
    }

    /// Existence check, cache first.
    ///
    /// A positive cache answer never touches the remote. A negative or
    /// failing cache answer delegates to the remote; the remote's answer is
    /// not written back (only `fetch` populates the cache).
    pub async fn exists(&self, desc: &Descriptor) -> StoreResult<bool> {
        match self.cache.exists(desc).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => {
                warn!(digest = %desc.digest, error = %e, "cache exists failed; asking remote");
            }
        }
        self.remote.exists(desc).await
    }

    /// Fetch, serving from the cache when possible.
    ///
    /// On a miss the returned stream carries the remote content while a
    /// background task populates the cache. Call [`CachedFetch::close`] after
    /// reading to join that task and observe its outcome. A remote fetch
    /// failure is propagated unchanged.
    pub async fn fetch(&self, desc: &Descriptor) -> StoreResult<CachedFetch> {
        match self.cache.fetch(desc).await {
            Ok(stream) => {
                debug!(digest = %desc.digest, "cache hit");
                return Ok(CachedFetch {
                    inner: FetchInner::Cached { stream },
                });
            }
            Err(e) if e.is_not_found() => {
                debug!(digest = %desc.digest, "cache miss");
            }
            Err(e) => {
                warn!(digest = %desc.digest, error = %e, "cache fetch failed; treating as miss");
            }
        }

        let remote = self.remote.fetch(desc).await?;

        let (pipe_writer, pipe_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let cache = Arc::clone(&self.cache);
        let population_desc = desc.clone();
        let task = tokio::spawn(async move {
            cache
                .push(&population_desc, Box::pin(pipe_reader) as ByteStream)
                .await
        });

        Ok(CachedFetch {
            inner: FetchInner::Remote(RemoteFetch {
                remote,
                pipe: Some(pipe_writer),
                task: Some(task),
                buf: Vec::new(),
                mirrored: 0,
                delivered: 0,
                eof: false,
                pipe_shut: false,
            }),
        })
    }
}

/// The stream handed out by [`CachedTarget::fetch`].
pub struct CachedFetch {
    inner: FetchInner,
}

enum FetchInner {
    Cached { stream: ByteStream },
    Remote(RemoteFetch),
}

impl CachedFetch {
    /// Whether this fetch was served from the cache.
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.inner, FetchInner::Cached { .. })
    }

    /// Close the stream: stop the remote read, signal pipe closure, and wait
    /// for the background cache population to finish.
    ///
    /// Returns `CachePopulation` if the background push failed, even when the
    /// foreground read reported no error. Dropping without closing detaches
    /// the population task instead; its outcome is then unobservable.
    pub async fn close(self) -> StoreResult<()> {
        match self.inner {
            FetchInner::Cached { .. } => Ok(()),
            FetchInner::Remote(remote) => remote.close().await,
        }
    }
}

impl AsyncRead for CachedFetch {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            FetchInner::Cached { stream } => stream.as_mut().poll_read(cx, buf),
            FetchInner::Remote(remote) => Pin::new(remote).poll_read(cx, buf),
        }
    }
}

/// Cache-miss stream state: remote source, mirror pipe, drain task.
struct RemoteFetch {
    remote: ByteStream,
    pipe: Option<DuplexStream>,
    task: Option<JoinHandle<StoreResult<()>>>,
    /// Chunk read from the remote, not yet fully mirrored/delivered.
    buf: Vec<u8>,
    mirrored: usize,
    delivered: usize,
    eof: bool,
    pipe_shut: bool,
}

impl RemoteFetch {
    async fn close(mut self) -> StoreResult<()> {
        // Stop the remote-read side first.
        self.remote = Box::pin(tokio::io::empty());

        // Then signal pipe closure so the drain task sees EOF.
        if let Some(mut pipe) = self.pipe.take() {
            if let Err(e) = pipe.shutdown().await {
                warn!(error = %e, "cache pipe shutdown failed");
            }
        }

        // Finally wait for the background push and surface its outcome.
        match self.task.take() {
            Some(handle) => match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(StoreError::CachePopulation(Box::new(e))),
                Err(join) => Err(StoreError::CachePopulation(Box::new(StoreError::Io(
                    io::Error::other(join),
                )))),
            },
            None => Ok(()),
        }
    }
}

impl AsyncRead for RemoteFetch {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            // Mirror pending bytes into the pipe before handing them out, so
            // the cache-bound copy can never lag behind what the consumer has
            // already observed. Pipe failure abandons mirroring, not the read.
            while this.mirrored < this.buf.len() {
                let Some(pipe) = this.pipe.as_mut() else {
                    this.mirrored = this.buf.len();
                    break;
                };
                match ready!(Pin::new(pipe).poll_write(cx, &this.buf[this.mirrored..])) {
                    Ok(0) => {
                        warn!("cache pipe refused writes; abandoning population mirror");
                        this.pipe = None;
                        this.mirrored = this.buf.len();
                    }
                    Ok(n) => this.mirrored += n,
                    Err(e) => {
                        warn!(error = %e, "cache pipe write failed; abandoning population mirror");
                        this.pipe = None;
                        this.mirrored = this.buf.len();
                    }
                }
            }

            // Deliver the mirrored chunk to the consumer.
            if this.delivered < this.buf.len() {
                let n = out.remaining().min(this.buf.len() - this.delivered);
                out.put_slice(&this.buf[this.delivered..this.delivered + n]);
                this.delivered += n;
                return Poll::Ready(Ok(()));
            }

            if this.eof {
                // Natural EOF: shut the pipe so the drain task can finish.
                if !this.pipe_shut {
                    if let Some(pipe) = this.pipe.as_mut() {
                        if let Err(e) = ready!(Pin::new(pipe).poll_shutdown(cx)) {
                            warn!(error = %e, "cache pipe shutdown failed at EOF");
                        }
                    }
                    this.pipe_shut = true;
                }
                return Poll::Ready(Ok(()));
            }

            // Refill from the remote.
            this.buf.resize(READ_CHUNK, 0);
            this.mirrored = 0;
            this.delivered = 0;
            let mut rb = ReadBuf::new(&mut this.buf);
            match ready!(Pin::new(&mut this.remote).poll_read(cx, &mut rb)) {
                Ok(()) => {
                    let n = rb.filled().len();
                    this.buf.truncate(n);
                    if n == 0 {
                        this.eof = true;
                    }
                }
                Err(e) => {
                    this.buf.clear();
                    return Poll::Ready(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTarget;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;

    /// Remote stub that panics on any use: proves the cache kept it idle.
    struct UntouchableTarget;

    #[async_trait]
    impl Target for UntouchableTarget {
        async fn exists(&self, _desc: &Descriptor) -> StoreResult<bool> {
            panic!("remote must not be touched");
        }
        async fn fetch(&self, _desc: &Descriptor) -> StoreResult<ByteStream> {
            panic!("remote must not be touched");
        }
        async fn push(&self, _desc: &Descriptor, _content: ByteStream) -> StoreResult<()> {
            panic!("remote must not be touched");
        }
        async fn resolve(&self, _tag: &str) -> StoreResult<Descriptor> {
            panic!("remote must not be touched");
        }
    }

    /// Cache stub whose push drains its input and then fails.
    struct FailingCache;

    #[async_trait]
    impl Target for FailingCache {
        async fn exists(&self, _desc: &Descriptor) -> StoreResult<bool> {
            Ok(false)
        }
        async fn fetch(&self, desc: &Descriptor) -> StoreResult<ByteStream> {
            Err(StoreError::NotFound {
                digest: desc.digest.clone(),
            })
        }
        async fn push(&self, _desc: &Descriptor, mut content: ByteStream) -> StoreResult<()> {
            let mut sink = Vec::new();
            content.read_to_end(&mut sink).await?;
            Err(StoreError::transport("cache volume is read-only"))
        }
        async fn resolve(&self, tag: &str) -> StoreResult<Descriptor> {
            Err(StoreError::TagNotFound {
                tag: tag.to_string(),
            })
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn hit_never_contacts_the_remote() {
        let cache = MemoryTarget::new();
        let desc = cache.insert("application/octet-stream", payload(1024));

        let cached = CachedTarget::new(Arc::new(UntouchableTarget), Arc::new(cache));

        assert!(cached.exists(&desc).await.unwrap());

        let mut fetch = cached.fetch(&desc).await.unwrap();
        assert!(fetch.is_cache_hit());
        let mut out = Vec::new();
        fetch.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, payload(1024));
        fetch.close().await.unwrap();
    }

    #[tokio::test]
    async fn miss_streams_remote_and_populates_cache() {
        let remote = MemoryTarget::new();
        // Larger than the pipe capacity so backpressure actually engages.
        let content = payload(PIPE_CAPACITY * 3 + 17);
        let desc = remote.insert("application/octet-stream", content.clone());

        let cache = MemoryTarget::new();
        let cached = CachedTarget::new(Arc::new(remote), Arc::new(cache.clone()));

        assert!(!cache.exists(&desc).await.unwrap());

        let mut fetch = cached.fetch(&desc).await.unwrap();
        assert!(!fetch.is_cache_hit());
        let mut out = Vec::new();
        fetch.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, content);
        fetch.close().await.unwrap();

        // The cache alone now holds the object.
        assert!(cache.exists(&desc).await.unwrap());
        assert_eq!(&cache.fetch_bytes(&desc).await.unwrap()[..], &content[..]);
    }

    #[tokio::test]
    async fn failed_population_surfaces_at_close() {
        let remote = MemoryTarget::new();
        let content = payload(4096);
        let desc = remote.insert("application/octet-stream", content.clone());

        let cached = CachedTarget::new(Arc::new(remote), Arc::new(FailingCache));

        let mut fetch = cached.fetch(&desc).await.unwrap();
        let mut out = Vec::new();
        fetch.read_to_end(&mut out).await.unwrap();
        // Foreground read saw everything...
        assert_eq!(out, content);
        // ...and close still reports the background failure.
        let err = fetch.close().await.unwrap_err();
        assert_matches!(err, StoreError::CachePopulation(_));
    }

    #[tokio::test]
    async fn early_close_reports_truncated_population() {
        let remote = MemoryTarget::new();
        let content = payload(PIPE_CAPACITY * 2);
        let desc = remote.insert("application/octet-stream", content);

        let cache = MemoryTarget::new();
        let cached = CachedTarget::new(Arc::new(remote), Arc::new(cache.clone()));

        let mut fetch = cached.fetch(&desc).await.unwrap();
        let mut first = vec![0u8; 1024];
        fetch.read_exact(&mut first).await.unwrap();

        // Closing before EOF hands the cache a prefix; verification rejects
        // it and close surfaces the failure.
        let err = fetch.close().await.unwrap_err();
        assert_matches!(err, StoreError::CachePopulation(_));
        assert!(!cache.exists(&desc).await.unwrap());
    }

    #[tokio::test]
    async fn exists_falls_through_to_remote_on_cache_miss() {
        let remote = MemoryTarget::new();
        let desc = remote.insert("application/octet-stream", payload(16));

        let cache = MemoryTarget::new();
        let cached = CachedTarget::new(Arc::new(remote), Arc::new(cache.clone()));

        assert!(cached.exists(&desc).await.unwrap());
        // Exists never populates the cache.
        assert!(!cache.exists(&desc).await.unwrap());
    }

    #[tokio::test]
    async fn remote_fetch_failure_is_fatal() {
        let remote = MemoryTarget::new();
        let cache = MemoryTarget::new();
        let cached = CachedTarget::new(Arc::new(remote), Arc::new(cache));

        let desc = Descriptor::from_bytes("application/octet-stream", b"absent");
        let err = cached.fetch(&desc).await.err().unwrap();
        assert!(err.is_not_found());
    }
}
