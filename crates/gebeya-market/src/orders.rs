//! Order engine.
//!
//! Creates orders from a cart or an explicit line list, records payment
//! proofs and seller fulfillment updates, and drives the buyer-side end of
//! the escrow lifecycle (completion, cancellation).
//!
//! Every mutation follows the same shape: read the documents with their
//! versions, validate everything, build one batch, commit. A version
//! conflict re-runs the whole attempt.

use crate::actor::Actor;
use crate::cart::CartManager;
use crate::escrow::EscrowLedger;
use crate::keys;
use crate::ports::{notify_detached, AddressBook, Catalog, Notifier, ProofStorage, ProofUpload};
use crate::retry::retry_on_conflict;
use crate::MarketError;
use chrono::Utc;
use gebeya_commerce::{
    AddressId, Currency, DeliveryMethod, LineStatus, ListingId, Order, OrderId, OrderLine,
    OrderStatus, PaymentMethod, PaymentProof, UserId, EscrowShare,
};
use gebeya_store::{Batch, Expect, Store, Versioned};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One requested line of an explicit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ListingId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: impl Into<ListingId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Checkout parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Explicit lines; `None` or empty means "check out the cart".
    #[serde(default)]
    pub lines: Option<Vec<LineRequest>>,
    #[serde(default)]
    pub address: Option<AddressId>,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    /// Check out the buyer's cart.
    pub fn from_cart(delivery_method: DeliveryMethod, payment_method: PaymentMethod) -> Self {
        Self {
            lines: None,
            address: None,
            delivery_method,
            payment_method,
        }
    }

    pub fn with_lines(mut self, lines: Vec<LineRequest>) -> Self {
        self.lines = Some(lines);
        self
    }

    pub fn with_address(mut self, address: AddressId) -> Self {
        self.address = Some(address);
        self
    }

    fn uses_cart(&self) -> bool {
        self.lines.as_ref().map_or(true, |l| l.is_empty())
    }
}

/// The order engine.
#[derive(Clone)]
pub struct OrderEngine {
    store: Store,
    catalog: Arc<dyn Catalog>,
    addresses: Arc<dyn AddressBook>,
    proofs: Arc<dyn ProofStorage>,
    notifier: Arc<dyn Notifier>,
    carts: CartManager,
    ledger: EscrowLedger,
    currency: Currency,
}

impl OrderEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        catalog: Arc<dyn Catalog>,
        addresses: Arc<dyn AddressBook>,
        proofs: Arc<dyn ProofStorage>,
        notifier: Arc<dyn Notifier>,
        carts: CartManager,
        ledger: EscrowLedger,
        currency: Currency,
    ) -> Self {
        Self {
            store,
            catalog,
            addresses,
            proofs,
            notifier,
            carts,
            ledger,
            currency,
        }
    }

    /// Create an order.
    ///
    /// All lines are validated before anything is written; the order insert
    /// and the cart clear then go out in a single commit.
    #[instrument(skip(self, request), fields(delivery = %request.delivery_method, payment = %request.payment_method))]
    pub async fn create_order(&self, buyer: &UserId, request: &NewOrder) -> Result<Order, MarketError> {
        let address = self.resolve_address(buyer, request).await?;
        let order = retry_on_conflict("create_order", || self.try_create_order(buyer, request, address.as_ref())).await?;

        info!(order_id = %order.id, buyer = %buyer, total = %order.total_price, lines = order.products.len(), "Order created");
        for seller in order.sellers() {
            notify_detached(
                &self.notifier,
                seller,
                "New order",
                format!("Order {} is waiting for you", order.id),
            );
        }
        Ok(order)
    }

    async fn resolve_address(&self, buyer: &UserId, request: &NewOrder) -> Result<Option<AddressId>, MarketError> {
        match request.delivery_method {
            DeliveryMethod::Delivery => {
                let id = request.address.as_ref().ok_or(MarketError::MissingAddress)?;
                let address = self.addresses.address(id, buyer).await?;
                Ok(Some(address.id))
            }
            DeliveryMethod::Pickup => {
                if request.address.is_some() {
                    debug!("Ignoring address on a pickup order");
                }
                Ok(None)
            }
        }
    }

    async fn try_create_order(
        &self,
        buyer: &UserId,
        request: &NewOrder,
        address: Option<&AddressId>,
    ) -> Result<Order, MarketError> {
        let (requests, cart) = if request.uses_cart() {
            let cart = self
                .carts
                .load(buyer)
                .await?
                .filter(|doc| !doc.value.is_empty())
                .ok_or(MarketError::EmptyCart)?;
            let requests = cart
                .value
                .items
                .iter()
                .map(|item| LineRequest::new(item.listing.clone(), item.quantity))
                .collect::<Vec<_>>();
            (requests, Some(cart))
        } else {
            (merge_lines(request.lines.as_deref().unwrap_or_default()), None)
        };

        let mut lines = Vec::with_capacity(requests.len());
        for line in &requests {
            lines.push(self.snapshot_line(buyer, line).await?);
        }

        let order = Order::place(
            buyer.clone(),
            lines,
            address.cloned(),
            request.delivery_method,
            request.payment_method,
            self.currency,
        )?;

        let mut batch = Batch::new();
        batch.put(keys::order(&order.id), &order, Expect::Absent)?;
        if let Some(cart) = cart {
            let mut cleared = cart.value.clone();
            cleared.clear();
            batch.put(keys::cart(buyer), &cleared, cart.expect())?;
        }
        self.store.commit(batch).await?;
        Ok(order)
    }

    async fn snapshot_line(&self, buyer: &UserId, request: &LineRequest) -> Result<OrderLine, MarketError> {
        if request.quantity < 1 {
            return Err(MarketError::Validation(format!(
                "quantity for {} must be at least 1",
                request.product_id
            )));
        }
        let listing = self
            .catalog
            .listing(&request.product_id)
            .await?
            .ok_or_else(|| MarketError::InvalidProduct(request.product_id.clone()))?;
        if listing.is_owned_by(buyer) {
            return Err(MarketError::SelfPurchase(listing.id));
        }
        if !listing.can_fulfill(request.quantity) {
            return Err(MarketError::Validation(format!(
                "only {} of {} in stock",
                listing.stock, listing.id
            )));
        }
        Ok(OrderLine::snapshot(
            listing.id,
            listing.owner,
            listing.title,
            request.quantity,
            listing.price,
        )?)
    }

    /// Attach a payment proof to one line and mark it payment submitted.
    ///
    /// This is advisory: the payment status only changes when a gateway
    /// confirms or an admin verifies.
    #[instrument(skip(self, upload, transaction_id), fields(file = %upload.file_name))]
    pub async fn upload_payment_proof(
        &self,
        buyer: &UserId,
        order_id: &OrderId,
        product_id: &ListingId,
        upload: ProofUpload,
        transaction_id: &str,
    ) -> Result<Order, MarketError> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(MarketError::Validation("transaction id is required".to_string()));
        }

        // Check before storing so rejected uploads leave no orphan files.
        let order = self.load_order(order_id).await?;
        Self::check_proof_target(&order.value, buyer, product_id)?;

        let stored = self.proofs.store(upload).await?;
        let proof = PaymentProof {
            url: stored.url,
            storage_id: stored.storage_id,
            transaction_id: transaction_id.to_string(),
            submitted_at: Utc::now(),
        };

        let order = retry_on_conflict("upload_payment_proof", || {
            self.try_attach_proof(buyer, order_id, product_id, &proof)
        })
        .await?;

        if let Some(line) = order.line(product_id) {
            notify_detached(
                &self.notifier,
                line.seller_id.clone(),
                "Payment proof submitted",
                format!("The buyer uploaded a payment proof for {} on order {}", line.title, order.id),
            );
        }
        Ok(order)
    }

    fn check_proof_target(order: &Order, buyer: &UserId, product_id: &ListingId) -> Result<(), MarketError> {
        if &order.buyer != buyer {
            return Err(MarketError::NotAuthorized(format!(
                "order {} belongs to another buyer",
                order.id
            )));
        }
        let line = order.line(product_id).ok_or_else(|| MarketError::LineItemNotFound {
            order: order.id.clone(),
            product: product_id.clone(),
        })?;
        line.status.transition_to(LineStatus::PaymentSubmitted)?;
        Ok(())
    }

    async fn try_attach_proof(
        &self,
        buyer: &UserId,
        order_id: &OrderId,
        product_id: &ListingId,
        proof: &PaymentProof,
    ) -> Result<Order, MarketError> {
        let mut order = self.load_order(order_id).await?;
        Self::check_proof_target(&order.value, buyer, product_id)?;

        if let Some(line) = order.value.line_mut(product_id) {
            line.submit_proof(proof.clone())?;
        }
        order.value.updated_at = Utc::now();

        let mut batch = Batch::new();
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok(order.value)
    }

    /// Set the status of every line a seller has on an order.
    #[instrument(skip(self))]
    pub async fn change_order_status(
        &self,
        order_id: &OrderId,
        seller: &UserId,
        status: LineStatus,
    ) -> Result<Order, MarketError> {
        let order = retry_on_conflict("change_order_status", || self.try_change_status(order_id, seller, status)).await?;

        info!(order_id = %order.id, seller = %seller, line_status = %status, order_status = %order.status, "Line status changed");
        notify_detached(
            &self.notifier,
            order.buyer.clone(),
            "Order update",
            format!("Items from your order {} are now {}", order.id, status),
        );
        Ok(order)
    }

    async fn try_change_status(&self, order_id: &OrderId, seller: &UserId, status: LineStatus) -> Result<Order, MarketError> {
        let mut order = self.load_order(order_id).await?;
        if !order.value.has_seller(seller) {
            return Err(MarketError::OrderNotFound(order_id.clone()));
        }
        order.value.set_seller_line_status(seller, status)?;

        let mut batch = Batch::new();
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok(order.value)
    }

    /// Confirm receipt: `funds_held` → `completed`. Buyer or admin.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn complete_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        let order = retry_on_conflict("complete_order", || self.try_complete(actor, order_id)).await?;

        info!(order_id = %order.id, "Order completed");
        for seller in order.sellers() {
            notify_detached(
                &self.notifier,
                seller,
                "Order completed",
                format!("Order {} was confirmed and is ready for payout", order.id),
            );
        }
        Ok(order)
    }

    async fn try_complete(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        let mut order = self.load_order(order_id).await?;
        Self::check_buyer_or_admin(actor, &order.value)?;
        order.value.transition_to(OrderStatus::Completed)?;

        let mut batch = Batch::new();
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok(order.value)
    }

    /// Cancel an order before completion. Buyer or admin.
    ///
    /// Escrow held for the order is reversed in the same commit.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn cancel_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        let (order, reversed) = retry_on_conflict("cancel_order", || self.try_cancel(actor, order_id)).await?;

        if !reversed.is_empty() {
            self.ledger.log_reversal(&order.id, &reversed, actor);
        }
        info!(order_id = %order.id, "Order cancelled");
        for seller in order.sellers() {
            notify_detached(
                &self.notifier,
                seller,
                "Order cancelled",
                format!("Order {} was cancelled", order.id),
            );
        }
        Ok(order)
    }

    async fn try_cancel(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<(Order, Vec<EscrowShare>), MarketError> {
        let mut order = self.load_order(order_id).await?;
        Self::check_buyer_or_admin(actor, &order.value)?;
        let was_held = order.value.status == OrderStatus::FundsHeld;
        order.value.transition_to(OrderStatus::Cancelled)?;

        let mut batch = Batch::new();
        let reversed = if was_held {
            self.ledger.stage_reverse_hold(&mut order.value, &mut batch).await?
        } else {
            Vec::new()
        };
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok((order.value, reversed))
    }

    /// Read an order. Visible to its buyer, its sellers and admins.
    pub async fn get_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        let order = self.load_order(order_id).await?.value;
        if actor.is_admin() || order.buyer == actor.user || order.has_seller(&actor.user) {
            Ok(order)
        } else {
            Err(MarketError::NotAuthorized(format!(
                "order {} is not yours",
                order_id
            )))
        }
    }

    /// Orders placed by a buyer, newest first.
    pub async fn orders_for_buyer(&self, buyer: &UserId) -> Result<Vec<Order>, MarketError> {
        self.scan_orders(|o| &o.buyer == buyer).await
    }

    /// Orders with at least one line from a seller, newest first.
    pub async fn orders_for_seller(&self, seller: &UserId) -> Result<Vec<Order>, MarketError> {
        self.scan_orders(|o| o.has_seller(seller)).await
    }

    async fn scan_orders(&self, keep: impl Fn(&Order) -> bool) -> Result<Vec<Order>, MarketError> {
        let mut orders: Vec<Order> = self
            .store
            .scan::<Order>(keys::ORDERS)
            .await?
            .into_iter()
            .map(|doc| doc.value)
            .filter(|o| keep(o))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub(crate) async fn load_order(&self, order_id: &OrderId) -> Result<Versioned<Order>, MarketError> {
        self.store
            .get::<Order>(&keys::order(order_id))
            .await?
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))
    }

    fn check_buyer_or_admin(actor: &Actor, order: &Order) -> Result<(), MarketError> {
        if actor.is_admin() || order.buyer == actor.user {
            Ok(())
        } else {
            Err(MarketError::NotAuthorized(format!(
                "only the buyer or an admin can change order {}",
                order.id
            )))
        }
    }
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

/// Fold repeated listings into one line each, keeping first-seen order.
fn merge_lines(lines: &[LineRequest]) -> Vec<LineRequest> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}
