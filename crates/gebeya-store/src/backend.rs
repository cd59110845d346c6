//! Storage backends.

use crate::{Batch, DocKey, StoreError, StoredDoc, Write};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw document storage.
///
/// `commit` must be atomic: either every write in the batch is applied
/// or none is.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read one document.
    async fn get(&self, key: &DocKey) -> Result<Option<StoredDoc>, StoreError>;

    /// Read every document in a collection, ordered by id.
    async fn scan(&self, collection: &str) -> Result<Vec<(String, StoredDoc)>, StoreError>;

    /// Apply a batch. Returns the new version of each written document,
    /// in batch order (0 for deletes).
    async fn commit(&self, batch: Batch) -> Result<Vec<u64>, StoreError>;
}

/// Full contents of a store, as persisted to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collections: BTreeMap<String, BTreeMap<String, StoredDoc>>,
}

impl Snapshot {
    fn current_version(&self, key: &DocKey) -> u64 {
        self.collections
            .get(&key.collection)
            .and_then(|c| c.get(&key.id))
            .map(|d| d.version)
            .unwrap_or(0)
    }

    /// Check then apply a batch in place.
    pub(crate) fn apply(&mut self, batch: Batch) -> Result<Vec<u64>, StoreError> {
        batch.check_unique()?;
        for write in batch.writes() {
            write
                .expect()
                .check(write.key(), self.current_version(write.key()))?;
        }

        let mut versions = Vec::with_capacity(batch.len());
        for write in batch.writes().iter().cloned() {
            match write {
                Write::Put { key, value, .. } => {
                    let version = self.current_version(&key) + 1;
                    self.collections
                        .entry(key.collection)
                        .or_default()
                        .insert(key.id, StoredDoc { version, value });
                    versions.push(version);
                }
                Write::Delete { key, .. } => {
                    if let Some(collection) = self.collections.get_mut(&key.collection) {
                        collection.remove(&key.id);
                    }
                    versions.push(0);
                }
            }
        }
        Ok(versions)
    }
}

/// In-memory backend guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<Snapshot>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &DocKey) -> Result<Option<StoredDoc>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .collections
            .get(&key.collection)
            .and_then(|c| c.get(&key.id))
            .cloned())
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, StoredDoc)>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .collections
            .get(collection)
            .map(|c| c.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: Batch) -> Result<Vec<u64>, StoreError> {
        self.state.lock().apply(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expect;

    fn key(id: &str) -> DocKey {
        DocKey::new("docs", id)
    }

    #[tokio::test]
    async fn test_put_assigns_versions() {
        let backend = MemoryBackend::new();
        let mut batch = Batch::new();
        batch.put(key("a"), &"one", Expect::Absent).unwrap();
        assert_eq!(backend.commit(batch).await.unwrap(), vec![1]);

        let mut batch = Batch::new();
        batch.put(key("a"), &"two", Expect::Version(1)).unwrap();
        assert_eq!(backend.commit(batch).await.unwrap(), vec![2]);

        let doc = backend.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.value, serde_json::json!("two"));
    }

    #[tokio::test]
    async fn test_failed_precondition_writes_nothing() {
        let backend = MemoryBackend::new();
        let mut batch = Batch::new();
        batch.put(key("a"), &1, Expect::Absent).unwrap();
        backend.commit(batch).await.unwrap();

        let mut batch = Batch::new();
        batch.put(key("b"), &2, Expect::Absent).unwrap();
        batch.put(key("a"), &3, Expect::Version(5)).unwrap();
        let err = backend.commit(batch).await.unwrap_err();
        assert!(err.is_conflict());

        assert!(backend.get(&key("b")).await.unwrap().is_none());
        assert_eq!(backend.get(&key("a")).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_delete_and_scan() {
        let backend = MemoryBackend::new();
        let mut batch = Batch::new();
        batch.put(key("b"), &2, Expect::Any).unwrap();
        batch.put(key("a"), &1, Expect::Any).unwrap();
        backend.commit(batch).await.unwrap();

        let ids: Vec<String> = backend
            .scan("docs")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let mut batch = Batch::new();
        batch.delete(key("a"), Expect::Version(1));
        backend.commit(batch).await.unwrap();
        assert_eq!(backend.scan("docs").await.unwrap().len(), 1);
        assert!(backend.scan("missing").await.unwrap().is_empty());
    }
}
