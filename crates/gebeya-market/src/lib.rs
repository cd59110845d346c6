//! Marketplace services for Gebeya.
//!
//! This crate ties the domain types, the document store and the payment
//! adapters together:
//!
//! - **OrderEngine**: checkout, payment proofs, seller fulfillment updates,
//!   completion and cancellation
//! - **PaymentService**: payment initiation and idempotent confirmation
//!   handling for COD, Chapa and TeleBirr
//! - **EscrowLedger**: seller wallets and the hold / release movements
//! - **CartManager** and **StoreCatalog**: the buyer and seller inputs
//!
//! Every mutation is a read-validate-commit cycle against the store with
//! version preconditions, retried on conflict.
//!
//! # Example
//!
//! ```rust,ignore
//! use gebeya_market::prelude::*;
//!
//! let market = Marketplace::builder(Store::memory()).build();
//! market.carts.add_item(&buyer, &listing.id, 2).await?;
//! let checkout = market
//!     .payments
//!     .pay_with_cod(&buyer, NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod))
//!     .await?;
//! market.ledger.hold_funds(&Actor::admin(admin), &checkout.order.id).await?;
//! ```

mod actor;
mod cart;
mod catalog;
pub mod config;
mod error;
mod escrow;
pub mod keys;
mod marketplace;
mod orders;
mod payments;
mod ports;
mod retry;

pub use actor::{Actor, Role};
pub use cart::CartManager;
pub use catalog::StoreCatalog;
pub use config::{ConfigError, ConfigFormat, MarketConfig};
pub use error::{ErrorKind, MarketError};
pub use escrow::EscrowLedger;
pub use marketplace::{Marketplace, MarketplaceBuilder};
pub use orders::{LineRequest, NewOrder, OrderEngine};
pub use payments::{Checkout, PaymentRef, PaymentService, WebhookAck};
pub use ports::{
    AddressBook, Catalog, LocalProofStorage, MemoryProofStorage, Notifier, ProofStorage,
    ProofUpload, StoreAddressBook, StoredProof, TracingNotifier,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Actor, Checkout, ErrorKind, EscrowLedger, LineRequest, MarketConfig, MarketError,
        Marketplace, NewOrder, OrderEngine, PaymentService, ProofUpload, Role, WebhookAck,
    };
    pub use gebeya_commerce::prelude::*;
    pub use gebeya_store::Store;
}
