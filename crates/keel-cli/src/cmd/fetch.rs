//! Fetch a blob through the local cache.
//!
//! Flow: resolve the mirror for the reference, wrap the selected endpoint in
//! the fetch-through cache over the local store, then stream the content out.
//! A failed cache population is reported but does not fail the fetch; the
//! content already reached the caller.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::warn;

use keel_core::descriptor::{Descriptor, Digest};
use keel_store::{CachedTarget, FsTarget, HttpTarget, Target};

use crate::cmd::{endpoint_for, load_config};
use crate::output;

#[derive(Debug, Serialize)]
pub struct FetchOut {
    pub endpoint: String,
    pub digest: String,
    pub bytes: usize,
    pub cache_hit: bool,
    pub cache_populated: bool,
    pub wrote_to: Option<String>,
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config_path: &str,
    cache_root: &str,
    reference: &str,
    tag: Option<&str>,
    digest: Option<&str>,
    size: Option<u64>,
    media_type: &str,
    to: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (location, plain_http, skip_tls) = endpoint_for(&config, reference)?;

    let remote: Arc<dyn Target> = Arc::new(HttpTarget::new(&location, plain_http, skip_tls)?);
    let cache: Arc<dyn Target> = Arc::new(FsTarget::open(cache_root)?);

    let desc = match (tag, digest) {
        (Some(tag), None) => remote
            .resolve(tag)
            .await
            .with_context(|| format!("resolve tag {tag} at {location}"))?,
        (None, Some(digest)) => {
            let size = size.ok_or_else(|| anyhow!("--size is required with --digest"))?;
            Descriptor::new(media_type, Digest::parse(digest)?, size)
        }
        _ => return Err(anyhow!("pass exactly one of --tag or --digest")),
    };

    let cached = CachedTarget::new(remote, cache);
    let mut fetch = cached.fetch(&desc).await?;
    let cache_hit = fetch.is_cache_hit();

    let mut content = Vec::with_capacity(desc.size as usize);
    fetch.read_to_end(&mut content).await?;

    let cache_populated = match fetch.close().await {
        Ok(()) => !cache_hit,
        Err(e) => {
            warn!(digest = %desc.digest, error = %e, "cache population failed");
            false
        }
    };

    let actual = Digest::from_bytes(&content);
    if actual != desc.digest {
        return Err(anyhow!(
            "fetched content digest mismatch: expected {}, got {actual}",
            desc.digest
        ));
    }

    let wrote_to = match to {
        Some(path) => {
            tokio::fs::write(path, &content)
                .await
                .with_context(|| format!("write {path}"))?;
            Some(path.to_string())
        }
        None => {
            if !output::is_json() {
                use std::io::Write;
                std::io::stdout().write_all(&content)?;
                return Ok(());
            }
            None
        }
    };

    output::status("fetched", desc.digest.as_str());
    output::print(&FetchOut {
        endpoint: location,
        digest: desc.digest.to_string(),
        bytes: content.len(),
        cache_hit,
        cache_populated,
        wrote_to,
    })?;
    Ok(())
}
