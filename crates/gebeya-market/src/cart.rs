//! Store-backed cart manager.

use crate::keys;
use crate::ports::Catalog;
use crate::retry::retry_on_conflict;
use crate::MarketError;
use gebeya_commerce::{Cart, ListingId, UserId};
use gebeya_store::{Batch, Expect, Store, Versioned};
use std::sync::Arc;
use tracing::debug;

/// One cart per user, mutated only by its owner.
#[derive(Clone)]
pub struct CartManager {
    store: Store,
    catalog: Arc<dyn Catalog>,
}

impl CartManager {
    pub fn new(store: Store, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    /// The user's cart, empty if they never added anything.
    pub async fn cart(&self, user: &UserId) -> Result<Cart, MarketError> {
        Ok(self
            .load(user)
            .await?
            .map(|doc| doc.value)
            .unwrap_or_else(|| Cart::for_user(user.clone())))
    }

    pub(crate) async fn load(&self, user: &UserId) -> Result<Option<Versioned<Cart>>, MarketError> {
        Ok(self.store.get::<Cart>(&keys::cart(user)).await?)
    }

    /// Add a listing, or increase its quantity if already present.
    pub async fn add_item(&self, user: &UserId, listing: &ListingId, quantity: i64) -> Result<Cart, MarketError> {
        let found = self
            .catalog
            .listing(listing)
            .await?
            .ok_or_else(|| MarketError::InvalidProduct(listing.clone()))?;
        if found.is_owned_by(user) {
            return Err(MarketError::SelfPurchase(listing.clone()));
        }

        let cart = retry_on_conflict("add_to_cart", || self.try_update(user, listing, quantity, true)).await?;
        debug!(user = %user, listing = %listing, items = cart.items.len(), "Cart updated");
        Ok(cart)
    }

    /// Set a listing's quantity; zero or less removes it.
    pub async fn set_quantity(&self, user: &UserId, listing: &ListingId, quantity: i64) -> Result<Cart, MarketError> {
        retry_on_conflict("set_cart_quantity", || self.try_update(user, listing, quantity, false)).await
    }

    pub async fn remove_item(&self, user: &UserId, listing: &ListingId) -> Result<Cart, MarketError> {
        self.set_quantity(user, listing, 0).await
    }

    async fn try_update(
        &self,
        user: &UserId,
        listing: &ListingId,
        quantity: i64,
        add: bool,
    ) -> Result<Cart, MarketError> {
        let current = self.load(user).await?;
        let expect = Expect::from_read(current.as_ref());
        let mut cart = current
            .map(|doc| doc.value)
            .unwrap_or_else(|| Cart::for_user(user.clone()));

        if add {
            cart.add_item(listing.clone(), quantity)?;
        } else if !cart.update_quantity(listing, quantity)? && quantity > 0 {
            return Err(MarketError::NotFound(format!("cart item {}", listing)));
        }

        let mut batch = Batch::new();
        batch.put(keys::cart(user), &cart, expect)?;
        self.store.commit(batch).await?;
        Ok(cart)
    }
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager").finish_non_exhaustive()
    }
}
