//! Store-backed catalog: listings and seller profiles.

use crate::actor::Actor;
use crate::keys;
use crate::ports::Catalog;
use crate::retry::retry_on_conflict;
use crate::MarketError;
use async_trait::async_trait;
use gebeya_commerce::{Listing, ListingId, Money, Seller, SellerStatus, UserId};
use gebeya_store::{Batch, Expect, Store};
use tracing::{info, instrument};

/// Catalog reads plus the owner and admin writes that feed them.
#[derive(Debug, Clone)]
pub struct StoreCatalog {
    store: Store,
}

impl StoreCatalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create or replace a listing. Only its owner may replace it.
    pub async fn put_listing(&self, actor: &Actor, listing: &Listing) -> Result<(), MarketError> {
        if listing.owner != actor.user && !actor.is_admin() {
            return Err(MarketError::NotAuthorized(format!(
                "listing {} belongs to another seller",
                listing.id
            )));
        }
        if listing.price.is_negative() || listing.stock < 0 {
            return Err(MarketError::Validation(
                "price and stock must not be negative".to_string(),
            ));
        }

        retry_on_conflict("put_listing", || self.try_put_listing(actor, listing)).await
    }

    async fn try_put_listing(&self, actor: &Actor, listing: &Listing) -> Result<(), MarketError> {
        let key = keys::listing(&listing.id);
        let current = self.store.get::<Listing>(&key).await?;
        if let Some(existing) = &current {
            if existing.value.owner != actor.user && !actor.is_admin() {
                return Err(MarketError::NotAuthorized(format!(
                    "listing {} belongs to another seller",
                    listing.id
                )));
            }
        }
        let mut batch = Batch::new();
        batch.put(key, listing, Expect::from_read(current.as_ref()))?;
        self.store.commit(batch).await?;
        Ok(())
    }

    /// Change a listing's asking price. Existing orders keep their snapshot.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn reprice(&self, actor: &Actor, id: &ListingId, price: Money) -> Result<Listing, MarketError> {
        retry_on_conflict("reprice", || self.try_reprice(actor, id, price)).await
    }

    async fn try_reprice(&self, actor: &Actor, id: &ListingId, price: Money) -> Result<Listing, MarketError> {
        let key = keys::listing(id);
        let mut current = self
            .store
            .get::<Listing>(&key)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("listing {}", id)))?;
        if !current.value.is_owned_by(&actor.user) && !actor.is_admin() {
            return Err(MarketError::NotAuthorized(format!("listing {} belongs to another seller", id)));
        }
        current.value.price = price;

        let mut batch = Batch::new();
        batch.put(key, &current.value, current.expect())?;
        self.store.commit(batch).await?;
        Ok(current.value)
    }

    /// Register a seller profile for a user, pending approval.
    pub async fn register_seller(&self, user: &UserId, shop_name: &str) -> Result<Seller, MarketError> {
        if shop_name.trim().is_empty() {
            return Err(MarketError::Validation("shop name is required".to_string()));
        }
        let seller = Seller::new(user.clone(), shop_name.trim());
        let mut batch = Batch::new();
        batch.put(keys::seller(user), &seller, Expect::Absent)?;
        self.store.commit(batch).await.map_err(|e| {
            if e.is_conflict() {
                MarketError::Validation(format!("user {} already has a seller profile", user))
            } else {
                e.into()
            }
        })?;
        Ok(seller)
    }

    /// Approve or suspend a seller. Admin only.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn set_seller_status(
        &self,
        actor: &Actor,
        user: &UserId,
        status: SellerStatus,
    ) -> Result<Seller, MarketError> {
        actor.require_admin("set_seller_status")?;
        let seller = retry_on_conflict("set_seller_status", || self.try_set_seller_status(user, status)).await?;
        info!(seller = %user, status = status.as_str(), "Seller status changed");
        Ok(seller)
    }

    async fn try_set_seller_status(&self, user: &UserId, status: SellerStatus) -> Result<Seller, MarketError> {
        let key = keys::seller(user);
        let mut current = self
            .store
            .get::<Seller>(&key)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("seller {}", user)))?;
        current.value.status = status;

        let mut batch = Batch::new();
        batch.put(key, &current.value, current.expect())?;
        self.store.commit(batch).await?;
        Ok(current.value)
    }

    pub async fn listings(&self) -> Result<Vec<Listing>, MarketError> {
        Ok(self
            .store
            .scan::<Listing>(keys::LISTINGS)
            .await?
            .into_iter()
            .map(|doc| doc.value)
            .collect())
    }
}

#[async_trait]
impl Catalog for StoreCatalog {
    async fn listing(&self, id: &ListingId) -> Result<Option<Listing>, MarketError> {
        Ok(self.store.get::<Listing>(&keys::listing(id)).await?.map(|doc| doc.value))
    }

    async fn seller(&self, user: &UserId) -> Result<Option<Seller>, MarketError> {
        Ok(self.store.get::<Seller>(&keys::seller(user)).await?.map(|doc| doc.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gebeya_commerce::Currency;

    fn etb(minor: i64) -> Money {
        Money::new(minor, Currency::ETB)
    }

    #[tokio::test]
    async fn test_only_owner_can_edit_listing() {
        let catalog = StoreCatalog::new(Store::memory());
        let owner = Actor::member("seller");
        let listing = Listing::new(owner.user.clone(), "Scarf", etb(1500), 3);
        catalog.put_listing(&owner, &listing).await.unwrap();

        let other = Actor::member("mallory");
        assert!(matches!(
            catalog.put_listing(&other, &listing).await,
            Err(MarketError::NotAuthorized(_))
        ));
        assert!(matches!(
            catalog.reprice(&other, &listing.id, etb(1)).await,
            Err(MarketError::NotAuthorized(_))
        ));

        let repriced = catalog.reprice(&owner, &listing.id, etb(2000)).await.unwrap();
        assert_eq!(repriced.price, etb(2000));
        assert_eq!(catalog.listing(&listing.id).await.unwrap().unwrap().price, etb(2000));
    }

    #[tokio::test]
    async fn test_seller_status_admin_only() {
        let catalog = StoreCatalog::new(Store::memory());
        let user = UserId::new("seller");
        catalog.register_seller(&user, "Sheba Crafts").await.unwrap();
        assert!(catalog.register_seller(&user, "Again").await.is_err());

        let err = catalog
            .set_seller_status(&Actor::member("seller"), &user, SellerStatus::Approved)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 403);

        let seller = catalog
            .set_seller_status(&Actor::admin("root"), &user, SellerStatus::Approved)
            .await
            .unwrap();
        assert!(seller.is_payout_eligible());
        assert_eq!(catalog.seller(&user).await.unwrap().unwrap().status, SellerStatus::Approved);
    }
}
