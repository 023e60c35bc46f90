//! Thin HTTP adapter for the target contract.
//!
//! Marshals `exists`/`fetch`/`push`/`resolve` onto a conventional layout:
//! - `HEAD <base>/blobs/<digest>`: existence
//! - `GET  <base>/blobs/<digest>`: content
//! - `PUT  <base>/blobs/<digest>`: upload
//! - `GET  <base>/tags/<tag>`: JSON descriptor for a tag
//!
//! This adapter only marshals; retries, auth, and protocol negotiation stay
//! with the caller or the endpoint. The endpoint's `plain_http` and
//! `skip_tls` flags from the registry config are honored here.

use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use url::Url;

use keel_core::descriptor::Descriptor;

use crate::errors::{StoreError, StoreResult};
use crate::target::{ByteStream, Target};

/// A remote target reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTarget {
    base: Url,
    client: reqwest::Client,
}

impl HttpTarget {
    /// Build a target for an endpoint location.
    ///
    /// A location without a scheme gets `https://` (or `http://` when
    /// `plain_http` is set). `skip_tls` disables certificate verification.
    pub fn new(location: &str, plain_http: bool, skip_tls: bool) -> StoreResult<Self> {
        let with_scheme = if location.contains("://") {
            location.to_string()
        } else if plain_http {
            format!("http://{location}")
        } else {
            format!("https://{location}")
        };

        let base = Url::parse(with_scheme.trim_end_matches('/'))
            .map_err(|e| StoreError::transport(format!("invalid endpoint location: {e}")))?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(skip_tls)
            .build()
            .map_err(|e| StoreError::transport(format!("http client: {e}")))?;

        Ok(Self { base, client })
    }

    fn blob_url(&self, desc: &Descriptor) -> StoreResult<Url> {
        self.join(&format!("blobs/{}", desc.digest))
    }

    fn join(&self, suffix: &str) -> StoreResult<Url> {
        let text = format!("{}/{suffix}", self.base.as_str().trim_end_matches('/'));
        Url::parse(&text).map_err(|e| StoreError::transport(format!("invalid url {text}: {e}")))
    }
}

#[async_trait]
impl Target for HttpTarget {
    async fn exists(&self, desc: &Descriptor) -> StoreResult<bool> {
        let url = self.blob_url(desc)?;
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(StoreError::transport(format!("exists: status {status}")))
        }
    }

    async fn fetch(&self, desc: &Descriptor) -> StoreResult<ByteStream> {
        let url = self.blob_url(desc)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            let body = resp
                .bytes()
                .await
                .map_err(|e| StoreError::transport(e.to_string()))?;
            Ok(Box::pin(Cursor::new(body)))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(StoreError::NotFound {
                digest: desc.digest.clone(),
            })
        } else {
            Err(StoreError::transport(format!("fetch: status {status}")))
        }
    }

    async fn push(&self, desc: &Descriptor, mut content: ByteStream) -> StoreResult<()> {
        let url = self.blob_url(desc)?;
        let mut body = Vec::with_capacity(desc.size as usize);
        content.read_to_end(&mut body).await?;

        let resp = self
            .client
            .put(url)
            .header("content-type", desc.media_type.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::transport(format!(
                "push: status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn resolve(&self, tag: &str) -> StoreResult<Descriptor> {
        let url = self.join(&format!("tags/{tag}"))?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            let body = resp
                .bytes()
                .await
                .map_err(|e| StoreError::transport(e.to_string()))?;
            serde_json::from_slice(&body)
                .map_err(|e| StoreError::transport(format!("decode tag descriptor: {e}")))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(StoreError::TagNotFound {
                tag: tag.to_string(),
            })
        } else {
            Err(StoreError::transport(format!("resolve: status {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_defaults_follow_flags() {
        let t = HttpTarget::new("registry.example.com", false, false).unwrap();
        assert_eq!(t.base.scheme(), "https");

        let t = HttpTarget::new("mirror.internal:5000", true, false).unwrap();
        assert_eq!(t.base.scheme(), "http");

        let t = HttpTarget::new("http://explicit.example.com", false, false).unwrap();
        assert_eq!(t.base.scheme(), "http");
    }

    #[test]
    fn blob_urls_embed_the_digest() {
        let t = HttpTarget::new("registry.example.com/base/", false, false).unwrap();
        let desc = Descriptor::from_bytes("application/octet-stream", b"x");
        let url = t.blob_url(&desc).unwrap();
        assert_eq!(
            url.as_str(),
            format!("https://registry.example.com/base/blobs/{}", desc.digest)
        );
    }
}
