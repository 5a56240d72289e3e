//! Blob store collaborator used for expense receipts and workspace logos.
//!
//! Uploads are never fatal to the ledger write they accompany: callers turn an
//! upload error into a warning and carry on without the reference.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

static KEY_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Binary attachment supplied with a write (receipt scan, logo image).
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name, used to build the object key
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Empty uploads are treated as "no file selected".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Minimal blob store contract: persist bytes, return a public reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `bucket/key` and returns the URL to reference it by.
    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<String>;
}

/// Blob store writing objects below a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    /// Creates a store rooted at `root`; buckets become subdirectories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for DirectoryBlobStore {
    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<String> {
        if key.is_empty() || key == ".." || key.contains(['/', '\\']) {
            return Err(Error::validation("key", "object keys cannot contain paths"));
        }
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(key);
        // Existing objects are never replaced.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!(bucket, key, "Stored blob at {}", path.display());
        Ok(format!("file://{}", path.display()))
    }
}

/// Object key for an upload: timestamp plus a process-wide counter, so keys stay
/// unique within a bucket even for uploads in the same millisecond.
#[must_use]
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = KEY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    if safe.is_empty() {
        format!("{prefix}{millis}-{seq}")
    } else {
        format!("{prefix}{millis}-{seq}-{safe}")
    }
}
