//! Filesystem content-addressable target.
//!
//! Layout under the root directory:
//! - `objects/<aa>/<rest-of-hex>`: blob content, sharded on the first two
//!   hex characters of the digest
//! - `tags/<name>`: JSON descriptor the tag points at
//!
//! Pushes stream into `<object>.part` while hashing, verify size and digest,
//! then rename into place. A failed verification removes the partial file and
//! leaves the store unchanged, so concurrent pushes of the same digest can
//! only race on identical content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest as _, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use keel_core::descriptor::{Descriptor, Digest};

use crate::errors::{StoreError, StoreResult};
use crate::target::{ByteStream, Target};

const READ_CHUNK: usize = 64 * 1024;

/// A filesystem CAS rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsTarget {
    root: PathBuf,
}

impl FsTarget {
    /// Open (creating directories as needed) a store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("objects"))?;
        std::fs::create_dir_all(root.join("tags"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest.hex();
        let (shard, rest) = hex.split_at(2);
        self.root.join("objects").join(shard).join(rest)
    }

    fn tag_path(&self, tag: &str) -> StoreResult<PathBuf> {
        // Tag names become file names; keep them to one path segment.
        if tag.is_empty() || tag.contains(['/', '\\', '\0']) || tag == "." || tag == ".." {
            return Err(StoreError::InvalidTag {
                tag: tag.to_string(),
            });
        }
        Ok(self.root.join("tags").join(tag))
    }

    /// Point a tag at a descriptor.
    pub async fn tag(&self, tag: &str, desc: &Descriptor) -> StoreResult<()> {
        let path = self.tag_path(tag)?;
        let json = serde_json::to_vec_pretty(desc)
            .map_err(|e| StoreError::transport(format!("encode tag descriptor: {e}")))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl Target for FsTarget {
    async fn exists(&self, desc: &Descriptor) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.object_path(&desc.digest)).await?)
    }

    async fn fetch(&self, desc: &Descriptor) -> StoreResult<ByteStream> {
        let path = self.object_path(&desc.digest);
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                digest: desc.digest.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn push(&self, desc: &Descriptor, mut content: ByteStream) -> StoreResult<()> {
        let final_path = self.object_path(&desc.digest);
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part_path = final_path.with_extension("part");
        let mut file = tokio::fs::File::create(&part_path).await?;

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut chunk = vec![0u8; READ_CHUNK];
        let outcome: StoreResult<()> = loop {
            let n = match content.read(&mut chunk).await {
                Ok(0) => break Ok(()),
                Ok(n) => n,
                Err(e) => break Err(e.into()),
            };
            hasher.update(&chunk[..n]);
            total += n as u64;
            if let Err(e) = file.write_all(&chunk[..n]).await {
                break Err(e.into());
            }
        };

        let verified = outcome.and_then(|()| {
            if total != desc.size {
                return Err(StoreError::SizeMismatch {
                    expected: desc.size,
                    actual: total,
                });
            }
            let actual = Digest::parse(&format!("sha256:{}", hex::encode(hasher.finalize())))
                .map_err(|e| StoreError::transport(format!("internal digest encode: {e}")))?;
            if actual != desc.digest {
                return Err(StoreError::DigestMismatch {
                    expected: desc.digest.clone(),
                    actual,
                });
            }
            Ok(())
        });

        match verified {
            Ok(()) => {
                file.flush().await?;
                drop(file);
                tokio::fs::rename(&part_path, &final_path).await?;
                Ok(())
            }
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }

    async fn resolve(&self, tag: &str) -> StoreResult<Descriptor> {
        let path = self.tag_path(tag)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::TagNotFound {
                    tag: tag.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map_err(|e| StoreError::transport(format!("decode tag descriptor: {e}")))
    }
}
