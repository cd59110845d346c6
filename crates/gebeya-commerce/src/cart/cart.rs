//! Cart and cart item types.

use crate::error::CommerceError;
use crate::ids::{CartId, ListingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per cart item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// A user's shopping cart.
///
/// There is exactly one cart per user. Items only reference listings;
/// prices are read from the catalog at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Owning user.
    pub user: UserId,
    /// Items in the cart.
    pub items: Vec<CartItem>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart for a user.
    pub fn for_user(user: UserId) -> Self {
        Self {
            id: CartId::generate(),
            user,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add a listing to the cart.
    ///
    /// Adding a listing that is already present increases its quantity.
    /// Returns an error if:
    /// - Quantity is not positive
    /// - Adding would exceed MAX_QUANTITY_PER_ITEM
    pub fn add_item(&mut self, listing: ListingId, quantity: i64) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.listing == listing) {
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;

            if new_quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    new_quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }

            existing.quantity = new_quantity;
            self.updated_at = Utc::now();
            return Ok(());
        }

        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        self.items.push(CartItem { listing, quantity });
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set the quantity of a listing. A quantity of zero or less removes it.
    pub fn update_quantity(
        &mut self,
        listing: &ListingId,
        quantity: i64,
    ) -> Result<bool, CommerceError> {
        if quantity <= 0 {
            return Ok(self.remove_item(listing));
        }

        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        match self.items.iter_mut().find(|i| &i.listing == listing) {
            Some(item) => {
                item.quantity = quantity;
                self.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a listing from the cart.
    pub fn remove_item(&mut self, listing: &ListingId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.listing != listing);
        let removed = self.items.len() < len_before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A listing selected in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Referenced listing.
    pub listing: ListingId,
    /// Quantity, always at least 1.
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::for_user(UserId::new("buyer-1"))
    }

    #[test]
    fn test_add_item() {
        let mut cart = cart();
        cart.add_item(ListingId::new("a"), 2).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_add_existing_item_increments() {
        let mut cart = cart();
        cart.add_item(ListingId::new("a"), 2).unwrap();
        cart.add_item(ListingId::new("a"), 3).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = cart();
        assert_eq!(
            cart.add_item(ListingId::new("a"), 0),
            Err(CommerceError::InvalidQuantity(0))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = cart();
        cart.add_item(ListingId::new("a"), MAX_QUANTITY_PER_ITEM).unwrap();
        assert!(matches!(
            cart.add_item(ListingId::new("a"), 1),
            Err(CommerceError::QuantityExceedsLimit(_, _))
        ));
    }

    #[test]
    fn test_update_quantity_to_zero_removes() {
        let mut cart = cart();
        cart.add_item(ListingId::new("a"), 2).unwrap();
        assert!(cart.update_quantity(&ListingId::new("a"), 0).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cart = cart();
        cart.add_item(ListingId::new("a"), 1).unwrap();
        cart.add_item(ListingId::new("b"), 1).unwrap();
        cart.clear();
        assert!(cart.is_empty());
    }
}
