//! Service wiring.

use crate::cart::CartManager;
use crate::catalog::StoreCatalog;
use crate::config::MarketConfig;
use crate::escrow::EscrowLedger;
use crate::orders::OrderEngine;
use crate::payments::PaymentService;
use crate::ports::{
    Catalog, LocalProofStorage, MemoryProofStorage, Notifier, ProofStorage, StoreAddressBook,
    TracingNotifier,
};
use crate::MarketError;
use gebeya_commerce::Currency;
use gebeya_payments::{
    ChapaProvider, CodProvider, HttpTransport, PaymentProvider, ReqwestTransport, TeleBirrProvider,
};
use gebeya_store::Store;
use std::sync::Arc;
use tracing::info;

/// Every marketplace service, sharing one store.
#[derive(Clone, Debug)]
pub struct Marketplace {
    pub store: Store,
    pub catalog: StoreCatalog,
    pub addresses: StoreAddressBook,
    pub carts: CartManager,
    pub orders: OrderEngine,
    pub ledger: EscrowLedger,
    pub payments: PaymentService,
}

impl Marketplace {
    pub fn builder(store: Store) -> MarketplaceBuilder {
        MarketplaceBuilder::new(store)
    }

    /// Wire the services described by a config file.
    ///
    /// Gateways get a reqwest transport each, with their own timeouts.
    pub async fn from_config(config: &MarketConfig) -> Result<Self, MarketError> {
        let store = match &config.store.path {
            Some(path) => Store::open_file(path).await?,
            None => Store::memory(),
        };

        let mut builder = Self::builder(store)
            .currency(config.market.currency)
            .proof_storage(Arc::new(LocalProofStorage::new(
                config.proofs.dir.clone(),
                config.proofs.public_base_url.clone(),
            )));

        if let Some(chapa) = &config.payments.chapa {
            let transport = reqwest_transport(chapa.policy.timeout)?;
            builder = builder.provider(Arc::new(ChapaProvider::new(chapa.clone(), transport)));
        }
        if let Some(telebirr) = &config.payments.telebirr {
            let transport = reqwest_transport(telebirr.policy.timeout)?;
            builder = builder.provider(Arc::new(TeleBirrProvider::new(telebirr.clone(), transport)));
        }

        let market = builder.build();
        info!(
            currency = %config.market.currency,
            store = ?config.store.path,
            payments = ?market.payments,
            "Marketplace ready"
        );
        Ok(market)
    }
}

fn reqwest_transport(timeout: gebeya_payments::TimeoutConfig) -> Result<Arc<dyn HttpTransport>, MarketError> {
    let transport = ReqwestTransport::new(timeout)
        .map_err(|e| MarketError::Internal(format!("http client: {e}")))?;
    Ok(Arc::new(transport))
}

/// Builds a [`Marketplace`]. COD is always available.
pub struct MarketplaceBuilder {
    store: Store,
    currency: Currency,
    proofs: Arc<dyn ProofStorage>,
    notifier: Arc<dyn Notifier>,
    providers: Vec<Arc<dyn PaymentProvider>>,
}

impl MarketplaceBuilder {
    fn new(store: Store) -> Self {
        Self {
            store,
            currency: Currency::default(),
            proofs: Arc::new(MemoryProofStorage::new()),
            notifier: Arc::new(TracingNotifier),
            providers: vec![Arc::new(CodProvider)],
        }
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn proof_storage(mut self, proofs: Arc<dyn ProofStorage>) -> Self {
        self.proofs = proofs;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Add a payment provider, replacing any earlier one for the same method.
    pub fn provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Marketplace {
        let store = self.store;
        let catalog = StoreCatalog::new(store.clone());
        let catalog_port: Arc<dyn Catalog> = Arc::new(catalog.clone());
        let addresses = StoreAddressBook::new(store.clone());
        let carts = CartManager::new(store.clone(), Arc::clone(&catalog_port));
        let ledger = EscrowLedger::new(
            store.clone(),
            Arc::clone(&catalog_port),
            Arc::clone(&self.notifier),
            self.currency,
        );
        let orders = OrderEngine::new(
            store.clone(),
            catalog_port,
            Arc::new(addresses.clone()),
            self.proofs,
            Arc::clone(&self.notifier),
            carts.clone(),
            ledger.clone(),
            self.currency,
        );
        let payments = self
            .providers
            .into_iter()
            .fold(PaymentService::new(store.clone(), orders.clone(), self.notifier), |service, provider| {
                service.with_provider(provider)
            });

        Marketplace {
            store,
            catalog,
            addresses,
            carts,
            orders,
            ledger,
            payments,
        }
    }
}
