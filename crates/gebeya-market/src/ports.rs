//! Collaborator interfaces consumed by the services, with the
//! implementations the workspace ships.

use crate::keys;
use crate::MarketError;
use async_trait::async_trait;
use chrono::Utc;
use gebeya_commerce::{Address, AddressId, Listing, ListingId, Seller, UserId};
use gebeya_store::{Batch, Expect, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Listing and seller lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn listing(&self, id: &ListingId) -> Result<Option<Listing>, MarketError>;

    /// Seller profile by the seller's user id.
    async fn seller(&self, user: &UserId) -> Result<Option<Seller>, MarketError>;
}

/// Buyer address lookup.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Fails with `NotFound` when the address is absent or belongs to
    /// someone else.
    async fn address(&self, id: &AddressId, owner: &UserId) -> Result<Address, MarketError>;
}

/// A payment proof file as uploaded by the buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where a proof file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProof {
    pub url: String,
    pub storage_id: String,
}

/// File storage for payment proofs.
#[async_trait]
pub trait ProofStorage: Send + Sync {
    async fn store(&self, upload: ProofUpload) -> Result<StoredProof, MarketError>;
}

/// Fire-and-forget notifications (email, SMS, push).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &UserId, subject: &str, body: &str) -> Result<(), MarketError>;
}

/// Send a notification in the background. Failures are logged only.
pub(crate) fn notify_detached(
    notifier: &Arc<dyn Notifier>,
    recipient: UserId,
    subject: impl Into<String>,
    body: impl Into<String>,
) {
    let notifier = Arc::clone(notifier);
    let subject = subject.into();
    let body = body.into();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&recipient, &subject, &body).await {
            warn!(recipient = %recipient, subject = %subject, error = %e, "Notification failed");
        }
    });
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, recipient: &UserId, subject: &str, body: &str) -> Result<(), MarketError> {
        info!(recipient = %recipient, subject, body, "Notification");
        Ok(())
    }
}

/// Address book backed by the document store.
#[derive(Debug, Clone)]
pub struct StoreAddressBook {
    store: Store,
}

impl StoreAddressBook {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Save or replace an address.
    pub async fn save(&self, address: &Address) -> Result<(), MarketError> {
        if !address.is_complete() {
            return Err(MarketError::Validation(
                "address needs a street, city and phone".to_string(),
            ));
        }
        let mut batch = Batch::new();
        batch.put(keys::address(&address.id), address, Expect::Any)?;
        self.store.commit(batch).await?;
        Ok(())
    }
}

#[async_trait]
impl AddressBook for StoreAddressBook {
    async fn address(&self, id: &AddressId, owner: &UserId) -> Result<Address, MarketError> {
        match self.store.get::<Address>(&keys::address(id)).await? {
            Some(doc) if &doc.value.owner == owner => Ok(doc.value),
            _ => Err(MarketError::NotFound(format!("address {}", id))),
        }
    }
}

/// Writes proofs into a local directory.
#[derive(Debug, Clone)]
pub struct LocalProofStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalProofStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn extension(file_name: &str) -> &str {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
    }
}

#[async_trait]
impl ProofStorage for LocalProofStorage {
    async fn store(&self, upload: ProofUpload) -> Result<StoredProof, MarketError> {
        if upload.bytes.is_empty() {
            return Err(MarketError::Validation("proof file is empty".to_string()));
        }
        let storage_id = format!(
            "proof_{}_{}.{}",
            Utc::now().format("%Y%m%d%H%M%S"),
            gebeya_commerce::generate_id("f"),
            Self::extension(&upload.file_name)
        );
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| MarketError::Internal(format!("proof storage: {}", e)))?;
        tokio::fs::write(self.root.join(&storage_id), &upload.bytes)
            .await
            .map_err(|e| MarketError::Internal(format!("proof storage: {}", e)))?;

        Ok(StoredProof {
            url: format!("{}/{}", self.public_base_url.trim_end_matches('/'), storage_id),
            storage_id,
        })
    }
}

/// Keeps proofs in memory.
#[derive(Debug, Default)]
pub struct MemoryProofStorage {
    files: Mutex<Vec<(StoredProof, ProofUpload)>>,
}

impl MemoryProofStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }
}

#[async_trait]
impl ProofStorage for MemoryProofStorage {
    async fn store(&self, upload: ProofUpload) -> Result<StoredProof, MarketError> {
        if upload.bytes.is_empty() {
            return Err(MarketError::Validation("proof file is empty".to_string()));
        }
        let mut files = self.files.lock().await;
        let storage_id = format!("mem-{}", files.len() + 1);
        let stored = StoredProof {
            url: format!("memory://proofs/{}", storage_id),
            storage_id,
        };
        files.push((stored.clone(), upload));
        Ok(stored)
    }
}
