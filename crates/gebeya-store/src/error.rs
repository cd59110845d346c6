//! Store error types.

use crate::DocKey;
use thiserror::Error;

/// Errors that can occur when using the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store.
    #[error("Failed to open store: {0}")]
    OpenError(String),

    /// Failed to serialize or deserialize a document.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Failed to read or write the snapshot file.
    #[error("Store I/O failed: {0}")]
    IoError(#[from] std::io::Error),

    /// A batch write asserted a version the document no longer has.
    ///
    /// Version 0 means the document did not exist.
    #[error("Version conflict on {key}: expected {expected}, found {found}")]
    VersionConflict { key: DocKey, expected: u64, found: u64 },

    /// The same document appears twice in one batch.
    #[error("Duplicate write in batch: {0}")]
    DuplicateWrite(DocKey),

    /// Concurrent modification persisted through every retry.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl StoreError {
    /// Whether re-reading and retrying the operation may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
