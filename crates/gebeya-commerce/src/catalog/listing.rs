//! Product listings.

use crate::ids::{ListingId, UserId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Item condition as declared by the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    New,
    Used,
    Refurbished,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::Refurbished => "refurbished",
        }
    }
}

/// A product listed by a seller.
///
/// Carts, favorites and order lines reference a listing; they never own it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Unique listing identifier.
    pub id: ListingId,
    /// User account of the seller that owns the listing.
    pub owner: UserId,
    /// Listing title.
    pub title: String,
    /// Current asking price.
    pub price: Money,
    /// Units in stock.
    pub stock: i64,
    /// Category slug.
    pub category: String,
    /// Item condition.
    #[serde(default)]
    pub condition: Condition,
}

impl Listing {
    /// Create a new listing with a generated id.
    pub fn new(owner: UserId, title: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            id: ListingId::generate(),
            owner,
            title: title.into(),
            price,
            stock,
            category: "general".to_string(),
            condition: Condition::New,
        }
    }

    /// Check whether the given user owns this listing.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// Check if the requested quantity is in stock.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_listing_ownership() {
        let seller = UserId::new("seller-1");
        let listing = Listing::new(seller.clone(), "Jebena", Money::new(1500, Currency::ETB), 3);
        assert!(listing.is_owned_by(&seller));
        assert!(!listing.is_owned_by(&UserId::new("buyer-1")));
    }

    #[test]
    fn test_listing_stock() {
        let listing = Listing::new(UserId::new("s"), "Mesob", Money::new(100, Currency::ETB), 2);
        assert!(listing.can_fulfill(2));
        assert!(!listing.can_fulfill(3));
        assert!(!listing.can_fulfill(0));
    }
}
