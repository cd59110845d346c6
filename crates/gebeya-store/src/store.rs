//! Typed store handle.

use crate::backend::{Backend, MemoryBackend};
use crate::file::FileBackend;
use crate::{Batch, DocKey, StoreError, Versioned};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Type-safe handle over a [`Backend`].
///
/// Provides automatic JSON (de)serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Cloning is cheap and clones share
/// the same backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// An empty in-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// A store persisted to a JSON snapshot file.
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(FileBackend::open(path).await?)))
    }

    /// Get a document with its version.
    ///
    /// Returns `None` if the document doesn't exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &DocKey,
    ) -> Result<Option<Versioned<T>>, StoreError> {
        match self.backend.get(key).await? {
            Some(doc) => Ok(Some(Versioned::decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Read every document in a collection, ordered by id.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<Versioned<T>>, StoreError> {
        self.backend
            .scan(collection)
            .await?
            .into_iter()
            .map(|(_, doc)| Versioned::decode(doc))
            .collect()
    }

    /// Commit a batch atomically.
    pub async fn commit(&self, batch: Batch) -> Result<Vec<u64>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.backend.commit(batch).await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expect;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let store = Store::memory();
        let key = DocKey::new("counters", "c1");

        let mut batch = Batch::new();
        batch.put(key.clone(), &Counter { hits: 1 }, Expect::Absent).unwrap();
        store.commit(batch).await.unwrap();

        let read: Versioned<Counter> = store.get(&key).await.unwrap().unwrap();
        assert_eq!(read.value, Counter { hits: 1 });
        assert_eq!(read.version, 1);
    }

    #[tokio::test]
    async fn test_stale_writer_loses() {
        let store = Store::memory();
        let key = DocKey::new("counters", "c1");
        let mut batch = Batch::new();
        batch.put(key.clone(), &Counter { hits: 0 }, Expect::Absent).unwrap();
        store.commit(batch).await.unwrap();

        let first: Versioned<Counter> = store.get(&key).await.unwrap().unwrap();
        let second: Versioned<Counter> = store.get(&key).await.unwrap().unwrap();

        let mut batch = Batch::new();
        batch.put(key.clone(), &Counter { hits: first.value.hits + 1 }, first.expect()).unwrap();
        store.commit(batch).await.unwrap();

        let mut batch = Batch::new();
        batch.put(key.clone(), &Counter { hits: second.value.hits + 1 }, second.expect()).unwrap();
        assert!(store.commit(batch).await.unwrap_err().is_conflict());

        let read: Versioned<Counter> = store.get(&key).await.unwrap().unwrap();
        assert_eq!(read.value.hits, 1);
    }

    #[tokio::test]
    async fn test_scan_skips_other_collections() {
        let store = Store::memory();
        let mut batch = Batch::new();
        batch.put(DocKey::new("counters", "a"), &Counter { hits: 1 }, Expect::Any).unwrap();
        batch.put(DocKey::new("counters", "b"), &Counter { hits: 2 }, Expect::Any).unwrap();
        batch.put(DocKey::new("other", "a"), &Counter { hits: 3 }, Expect::Any).unwrap();
        store.commit(batch).await.unwrap();

        let counters: Vec<Versioned<Counter>> = store.scan("counters").await.unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(counters[1].value.hits, 2);
    }
}
