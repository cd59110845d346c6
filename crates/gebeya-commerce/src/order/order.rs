//! Order types.

use std::collections::BTreeMap;

use crate::error::CommerceError;
use crate::ids::{AddressId, ListingId, OrderId, TxRef, UserId};
use crate::money::{Currency, Money};
use crate::order::{DeliveryMethod, LineStatus, OrderStatus, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A placed order.
///
/// Line items are snapshots taken at checkout: later listing edits never
/// change `products` or `total_price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Buyer user ID.
    pub buyer: UserId,
    /// Snapshotted line items.
    pub products: Vec<OrderLine>,
    /// Delivery address, present when `delivery_method` is delivery.
    pub address: Option<AddressId>,
    /// Delivery or pickup.
    pub delivery_method: DeliveryMethod,
    /// Sum of price × quantity over all lines.
    pub total_price: Money,
    /// Order status.
    pub status: OrderStatus,
    /// Whether the buyer payment is confirmed.
    pub is_paid: bool,
    /// When the payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Chosen payment method.
    pub payment_method: PaymentMethod,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Gateway reference (tx_ref / outTradeNo) once a payment was initiated.
    pub payment_reference: Option<TxRef>,
    /// Seller shares currently held in escrow. Emptied on release or reversal.
    #[serde(default)]
    pub escrow: Vec<EscrowShare>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new pending order from snapshotted lines.
    pub fn place(
        buyer: UserId,
        products: Vec<OrderLine>,
        address: Option<AddressId>,
        delivery_method: DeliveryMethod,
        payment_method: PaymentMethod,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        if products.is_empty() {
            return Err(CommerceError::Validation(
                "an order needs at least one line item".to_string(),
            ));
        }
        if delivery_method.requires_address() && address.is_none() {
            return Err(CommerceError::Validation(
                "delivery orders need an address".to_string(),
            ));
        }

        let mut total_price = Money::zero(currency);
        for line in &products {
            if line.price.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.code().to_string(),
                    got: line.price.currency.code().to_string(),
                });
            }
            let line_total = line.line_total()?;
            total_price = total_price
                .try_add(&line_total)
                .ok_or(CommerceError::Overflow)?;
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            buyer,
            products,
            address,
            delivery_method,
            total_price,
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            payment_method,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            escrow: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Recompute Σ price × quantity from the lines.
    pub fn computed_total(&self) -> Result<Money, CommerceError> {
        let totals = self
            .products
            .iter()
            .map(OrderLine::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::try_sum(totals.iter(), self.total_price.currency).ok_or(CommerceError::Overflow)
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.products.iter().map(|l| l.quantity).sum()
    }

    /// Sellers with at least one line on this order.
    pub fn sellers(&self) -> Vec<UserId> {
        let mut sellers: Vec<UserId> = self.products.iter().map(|l| l.seller_id.clone()).collect();
        sellers.sort();
        sellers.dedup();
        sellers
    }

    pub fn has_seller(&self, seller: &UserId) -> bool {
        self.products.iter().any(|l| &l.seller_id == seller)
    }

    /// Find a line by its listing.
    pub fn line(&self, product_id: &ListingId) -> Option<&OrderLine> {
        self.products.iter().find(|l| &l.product_id == product_id)
    }

    pub fn line_mut(&mut self, product_id: &ListingId) -> Option<&mut OrderLine> {
        self.products.iter_mut().find(|l| &l.product_id == product_id)
    }

    /// Per-seller totals over the lines that are not cancelled.
    pub fn seller_shares(&self) -> Result<Vec<EscrowShare>, CommerceError> {
        let mut shares: BTreeMap<UserId, Money> = BTreeMap::new();
        for line in self.products.iter().filter(|l| l.status != LineStatus::Cancelled) {
            let line_total = line.line_total()?;
            let entry = shares
                .entry(line.seller_id.clone())
                .or_insert_with(|| Money::zero(self.total_price.currency));
            *entry = entry.try_add(&line_total).ok_or(CommerceError::Overflow)?;
        }
        Ok(shares
            .into_iter()
            .map(|(seller, amount)| EscrowShare { seller, amount })
            .collect())
    }

    /// Move the order to a new status.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), CommerceError> {
        self.status = self.status.transition_to(next)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set every line of `seller` to `status`.
    ///
    /// All affected lines are validated before any is changed. Returns the
    /// number of lines updated.
    pub fn set_seller_line_status(
        &mut self,
        seller: &UserId,
        status: LineStatus,
    ) -> Result<usize, CommerceError> {
        if !status.is_seller_settable() {
            return Err(CommerceError::Validation(format!(
                "sellers cannot set line status {}",
                status
            )));
        }
        // Held escrow shares are fixed; cancelling past that point goes
        // through the order, which reverses the hold.
        let escrow_owned = !self.status.is_fulfillment_phase() && status == LineStatus::Cancelled;
        if self.status.is_terminal() || escrow_owned {
            return Err(CommerceError::IllegalTransition {
                entity: "order",
                from: self.status.to_string(),
                to: format!("line {}", status),
            });
        }
        for line in self.products.iter().filter(|l| &l.seller_id == seller) {
            if line.status != status {
                line.status.transition_to(status)?;
            }
        }

        let mut updated = 0;
        for line in self.products.iter_mut().filter(|l| &l.seller_id == seller) {
            line.status = status;
            updated += 1;
        }
        if updated > 0 {
            self.roll_up_fulfillment()?;
            self.updated_at = Utc::now();
        }
        Ok(updated)
    }

    /// Recompute the order-level fulfillment marker from the lines.
    ///
    /// Only applies while the order is still in its fulfillment phase; the
    /// escrow lifecycle owns the status afterwards.
    pub fn roll_up_fulfillment(&mut self) -> Result<(), CommerceError> {
        if !self.status.is_fulfillment_phase() {
            return Ok(());
        }
        let target = self
            .products
            .iter()
            .filter_map(|l| l.status.fulfillment_marker())
            .min()
            .unwrap_or(OrderStatus::Cancelled);
        if target != self.status {
            self.transition_to(target)?;
        }
        Ok(())
    }

    /// Record the gateway reference of an initiated payment.
    pub fn record_payment_reference(&mut self, tx_ref: TxRef) {
        self.payment_reference = Some(tx_ref);
        self.updated_at = Utc::now();
    }

    /// Mark the buyer payment as confirmed.
    ///
    /// Returns `false` when the order was already paid, so confirmations can
    /// be replayed safely.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> Result<bool, CommerceError> {
        if self.payment_status == PaymentStatus::Paid {
            return Ok(false);
        }
        self.payment_status = self.payment_status.transition_to(PaymentStatus::Paid)?;
        self.is_paid = true;
        self.paid_at = Some(at);
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Mark the payment attempt as failed. Returns `false` if already failed.
    pub fn mark_payment_failed(&mut self) -> Result<bool, CommerceError> {
        if self.payment_status == PaymentStatus::Failed {
            return Ok(false);
        }
        self.payment_status = self.payment_status.transition_to(PaymentStatus::Failed)?;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Reopen a failed payment so the buyer can retry.
    pub fn reopen_payment(&mut self) -> Result<(), CommerceError> {
        if self.payment_status == PaymentStatus::Failed {
            self.payment_status = self.payment_status.transition_to(PaymentStatus::Pending)?;
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Total currently held in escrow for this order.
    pub fn escrow_total(&self) -> Option<Money> {
        Money::try_sum(self.escrow.iter().map(|s| &s.amount), self.total_price.currency)
    }
}

/// A snapshotted line item in an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    /// Listing the line was created from.
    pub product_id: ListingId,
    /// Seller user at time of order.
    pub seller_id: UserId,
    /// Listing title at time of order.
    pub title: String,
    /// Quantity ordered.
    pub quantity: i64,
    /// Unit price at time of order.
    pub price: Money,
    /// Line status.
    pub status: LineStatus,
    /// Proof of payment uploaded by the buyer.
    pub payment_proof: Option<PaymentProof>,
}

impl OrderLine {
    /// Snapshot a line from listing data.
    pub fn snapshot(
        product_id: ListingId,
        seller_id: UserId,
        title: impl Into<String>,
        quantity: i64,
        price: Money,
    ) -> Result<Self, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        Ok(Self {
            product_id,
            seller_id,
            title: title.into(),
            quantity,
            price,
            status: LineStatus::Pending,
            payment_proof: None,
        })
    }

    /// price × quantity.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }

    /// Attach a payment proof and mark the line as payment submitted.
    pub fn submit_proof(&mut self, proof: PaymentProof) -> Result<(), CommerceError> {
        self.status = self.status.transition_to(LineStatus::PaymentSubmitted)?;
        self.payment_proof = Some(proof);
        Ok(())
    }
}

/// Reference to an uploaded payment proof.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentProof {
    /// Public URL of the stored file.
    pub url: String,
    /// Storage backend identifier.
    pub storage_id: String,
    /// Transaction id typed in by the buyer.
    pub transaction_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// Amount held in escrow for one seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscrowShare {
    pub seller: UserId,
    pub amount: Money,
}
