//! JSON snapshot file backend.

use crate::backend::{Backend, MemoryBackend, Snapshot};
use crate::{Batch, DocKey, StoreError, StoredDoc};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Backend that keeps documents in memory and rewrites a JSON snapshot
/// file after every successful commit.
///
/// Commits are serialized so snapshots reach the disk in commit order.
pub struct FileBackend {
    path: PathBuf,
    inner: MemoryBackend,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Open a snapshot file, starting empty if it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::OpenError(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), collections = snapshot.collections.len(), "Opened store snapshot");

        Ok(Self {
            path,
            inner: MemoryBackend::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.inner.snapshot())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn get(&self, key: &DocKey) -> Result<Option<StoredDoc>, StoreError> {
        self.inner.get(key).await
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, StoredDoc)>, StoreError> {
        self.inner.scan(collection).await
    }

    async fn commit(&self, batch: Batch) -> Result<Vec<u64>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let versions = self.inner.commit(batch).await?;
        self.persist().await?;
        Ok(versions)
    }
}
