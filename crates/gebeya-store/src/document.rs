//! Document keys, versions and write batches.

use crate::StoreError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Address of a document: a collection name plus an id within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocKey {
    pub collection: String,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.id)
    }
}

/// A stored document with its version.
///
/// Versions start at 1 on insert and grow by one on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDoc {
    pub version: u64,
    pub value: serde_json::Value,
}

/// A deserialized document together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    /// The precondition to use when writing this document back.
    pub fn expect(&self) -> Expect {
        Expect::Version(self.version)
    }
}

impl<T: DeserializeOwned> Versioned<T> {
    pub(crate) fn decode(doc: StoredDoc) -> Result<Self, StoreError> {
        Ok(Self {
            value: serde_json::from_value(doc.value)?,
            version: doc.version,
        })
    }
}

/// Version precondition attached to each write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Write unconditionally.
    Any,
    /// The document must not exist yet.
    Absent,
    /// The document must still be at this version.
    Version(u64),
}

impl Expect {
    /// Precondition for a document that may or may not have been read.
    pub fn from_read<T>(read: Option<&Versioned<T>>) -> Self {
        match read {
            Some(doc) => doc.expect(),
            None => Expect::Absent,
        }
    }

    pub(crate) fn check(&self, key: &DocKey, current: u64) -> Result<(), StoreError> {
        let expected = match self {
            Expect::Any => return Ok(()),
            Expect::Absent => 0,
            Expect::Version(v) => *v,
        };
        if expected != current {
            return Err(StoreError::VersionConflict {
                key: key.clone(),
                expected,
                found: current,
            });
        }
        Ok(())
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Put {
        key: DocKey,
        value: serde_json::Value,
        expect: Expect,
    },
    Delete {
        key: DocKey,
        expect: Expect,
    },
}

impl Write {
    pub fn key(&self) -> &DocKey {
        match self {
            Write::Put { key, .. } | Write::Delete { key, .. } => key,
        }
    }

    pub fn expect(&self) -> Expect {
        match self {
            Write::Put { expect, .. } | Write::Delete { expect, .. } => *expect,
        }
    }
}

/// A set of writes committed all-or-nothing.
///
/// Every precondition is checked before any write is applied. If one
/// fails, nothing in the batch is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a document write.
    pub fn put<T: Serialize>(
        &mut self,
        key: DocKey,
        value: &T,
        expect: Expect,
    ) -> Result<&mut Self, StoreError> {
        let value = serde_json::to_value(value)?;
        self.writes.push(Write::Put { key, value, expect });
        Ok(self)
    }

    /// Queue a document delete.
    pub fn delete(&mut self, key: DocKey, expect: Expect) -> &mut Self {
        self.writes.push(Write::Delete { key, expect });
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn check_unique(&self) -> Result<(), StoreError> {
        let mut seen = std::collections::HashSet::new();
        for write in &self.writes {
            if !seen.insert(write.key()) {
                return Err(StoreError::DuplicateWrite(write.key().clone()));
            }
        }
        Ok(())
    }
}
