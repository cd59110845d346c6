//! Marketplace domain types for Gebeya.
//!
//! This crate holds the values the marketplace services move around:
//!
//! - **Catalog**: listings and seller profiles
//! - **Cart**: one mutable cart per buyer
//! - **Order**: snapshotted order lines and the status state machines
//! - **Wallet**: seller balance and escrow columns
//!
//! Everything here is pure: no I/O, no clocks other than `Utc::now()` for
//! timestamps. Persistence and authorization live in `gebeya-market`.
//!
//! # Example
//!
//! ```rust,ignore
//! use gebeya_commerce::prelude::*;
//!
//! let line = OrderLine::snapshot(listing.id.clone(), listing.owner.clone(), &listing.title, 2, listing.price)?;
//! let order = Order::place(buyer, vec![line], None, DeliveryMethod::Pickup, PaymentMethod::Cod, Currency::ETB)?;
//! println!("Total: {}", order.total_price.display());
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod order;
pub mod wallet;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

pub use cart::{Cart, CartItem, MAX_QUANTITY_PER_ITEM};
pub use catalog::{Condition, Listing, Seller, SellerStatus};
pub use order::{
    Address, DeliveryMethod, EscrowShare, LineStatus, Order, OrderLine, OrderStatus,
    PaymentMethod, PaymentProof, PaymentStatus,
};
pub use wallet::Wallet;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{Condition, Listing, Seller, SellerStatus};

    // Cart
    pub use crate::cart::{Cart, CartItem, MAX_QUANTITY_PER_ITEM};

    // Orders
    pub use crate::order::{
        Address, DeliveryMethod, EscrowShare, LineStatus, Order, OrderLine, OrderStatus,
        PaymentMethod, PaymentProof, PaymentStatus,
    };

    // Wallet
    pub use crate::wallet::Wallet;
}
