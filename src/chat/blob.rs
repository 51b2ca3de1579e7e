use std::{io, path::PathBuf};

use async_trait::async_trait;
use tracing::debug;

/// Durable storage for uploaded audio. The session broadcasts audio inline
/// (base64) and attaches the locator returned here to the message row
/// afterwards, so an upload failure never invalidates a delivered event.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> io::Result<String>;
    async fn delete(&self, locator: &str) -> io::Result<()>;
}

/// Filesystem-backed store rooted at the configured media directory.
pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> io::Result<String> {
        let dir = self.root.join("audio");
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(filename), bytes).await?;
        debug!(filename, size = bytes.len(), "stored audio upload");
        Ok(format!("audio/{filename}"))
    }

    async fn delete(&self, locator: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.root.join(locator)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
