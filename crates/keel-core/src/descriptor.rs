//! Content descriptors.
//!
//! A descriptor is the opaque, comparable identifier used as the key for all
//! store operations: a content digest, the content size in bytes, and a media
//! type. Descriptors are value types; equality and ordering are derived from
//! all three fields so they can key maps directly.
//!
//! Digests are sha256 and rendered as `sha256:<lowercase hex>`. No implicit
//! algorithm defaults: the algorithm tag is part of the digest string.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::errors::{CoreError, CoreResult};

/// A content digest in `sha256:<hex>` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Compute the sha256 digest of raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut h = Sha256::new();
        h.update(bytes);
        Digest(format!("sha256:{}", hex::encode(h.finalize())))
    }

    /// Parse a digest string, validating the `sha256:<hex>` shape.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let Some(hex_part) = s.strip_prefix("sha256:") else {
            return Err(CoreError::invalid_argument(format!(
                "unsupported digest algorithm: {s}"
            )));
        };
        if hex_part.len() != 64 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::invalid_argument(format!(
                "malformed sha256 digest: {s}"
            )));
        }
        if hex_part.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::invalid_argument(format!(
                "digest hex must be lowercase: {s}"
            )));
        }
        Ok(Digest(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex portion without the algorithm tag.
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, h)| h).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content descriptor: the store-level identity of a blob.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
}

impl Descriptor {
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
        }
    }

    /// Build a descriptor by hashing the given bytes.
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: Digest::from_bytes(bytes),
            size: bytes.len() as u64,
        }
    }
}
