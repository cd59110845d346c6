//! Versioned document store for Gebeya.
//!
//! Documents are JSON values addressed by `collection:id`. Every document
//! carries a version, and writes are grouped into batches that commit
//! all-or-nothing after checking each write's version precondition.
//!
//! Callers use this for optimistic concurrency: read the documents they
//! need, compute the new state, then commit a batch that asserts the
//! versions they read. On a [`StoreError::VersionConflict`] they re-read
//! and try again, at most [`MAX_COMMIT_RETRIES`] times.
//!
//! # Example
//!
//! ```rust,ignore
//! use gebeya_store::{Batch, DocKey, Store};
//!
//! let store = Store::memory();
//! let key = DocKey::new("wallets", "usr_1");
//! let wallet = store.get::<Wallet>(&key).await?;
//!
//! let mut batch = Batch::new();
//! batch.put(key, &updated, Expect::from_read(wallet.as_ref()))?;
//! store.commit(batch).await?;
//! ```

mod backend;
mod document;
mod error;
mod file;
mod store;

pub use backend::{Backend, MemoryBackend, Snapshot};
pub use document::{Batch, DocKey, Expect, StoredDoc, Versioned, Write};
pub use error::StoreError;
pub use file::FileBackend;
pub use store::Store;

/// Maximum read-modify-commit attempts before giving up on a contended document.
pub const MAX_COMMIT_RETRIES: u32 = 3;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Batch, DocKey, Expect, Store, StoreError, Versioned, MAX_COMMIT_RETRIES};
}
