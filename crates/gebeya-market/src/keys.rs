//! Store collections and document keys.

use gebeya_commerce::{AddressId, ListingId, OrderId, TxRef, UserId};
use gebeya_store::DocKey;

pub const LISTINGS: &str = "listings";
/// Seller profiles, keyed by the seller's user id.
pub const SELLERS: &str = "sellers";
/// Carts, keyed by the owning user id.
pub const CARTS: &str = "carts";
pub const ORDERS: &str = "orders";
/// Wallets, keyed by the seller's user id.
pub const WALLETS: &str = "wallets";
pub const ADDRESSES: &str = "addresses";
/// tx_ref → order id index.
pub const PAYMENT_REFS: &str = "payment_refs";

pub fn listing(id: &ListingId) -> DocKey {
    DocKey::new(LISTINGS, id.as_str())
}

pub fn seller(user: &UserId) -> DocKey {
    DocKey::new(SELLERS, user.as_str())
}

pub fn cart(user: &UserId) -> DocKey {
    DocKey::new(CARTS, user.as_str())
}

pub fn order(id: &OrderId) -> DocKey {
    DocKey::new(ORDERS, id.as_str())
}

pub fn wallet(user: &UserId) -> DocKey {
    DocKey::new(WALLETS, user.as_str())
}

pub fn address(id: &AddressId) -> DocKey {
    DocKey::new(ADDRESSES, id.as_str())
}

pub fn payment_ref(tx_ref: &TxRef) -> DocKey {
    DocKey::new(PAYMENT_REFS, tx_ref.as_str())
}
