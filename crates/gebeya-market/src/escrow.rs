//! Escrow / wallet ledger.
//!
//! Money moves only here. Every operation commits the order and all
//! affected wallets in one batch, each write guarded by the version it
//! was read at, so a hold or release is applied exactly once even when
//! requests race.

use crate::actor::Actor;
use crate::keys;
use crate::ports::{notify_detached, Catalog, Notifier};
use crate::retry::retry_on_conflict;
use crate::MarketError;
use chrono::Utc;
use gebeya_commerce::{Currency, EscrowShare, Order, OrderId, OrderStatus, UserId, Wallet};
use gebeya_observability::AUDIT_TARGET;
use gebeya_store::{Batch, Expect, Store, Versioned};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy)]
enum Movement {
    Hold,
    Release,
    Reverse,
}

/// Seller wallets and the escrow movements between their two columns.
#[derive(Clone)]
pub struct EscrowLedger {
    store: Store,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn Notifier>,
    currency: Currency,
}

impl EscrowLedger {
    pub fn new(store: Store, catalog: Arc<dyn Catalog>, notifier: Arc<dyn Notifier>, currency: Currency) -> Self {
        Self {
            store,
            catalog,
            notifier,
            currency,
        }
    }

    /// A seller's wallet. Sellers that never received a hold read as empty.
    pub async fn wallet(&self, seller: &UserId) -> Result<Wallet, MarketError> {
        Ok(self
            .store
            .get::<Wallet>(&keys::wallet(seller))
            .await?
            .map(|doc| doc.value)
            .unwrap_or_else(|| Wallet::open(seller.clone(), self.currency)))
    }

    /// Verify the buyer payment and hold each seller's share in escrow.
    ///
    /// Marks the payment as paid if it is not already, moves the order to
    /// `funds_held` and credits `escrow_held` on every seller wallet,
    /// creating wallets on first use.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn hold_funds(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        actor.require_admin("hold_funds")?;
        let order = retry_on_conflict("hold_funds", || self.try_hold(order_id)).await?;

        for share in &order.escrow {
            info!(
                target: AUDIT_TARGET,
                order_id = %order.id,
                seller = %share.seller,
                amount = share.amount.amount_minor,
                currency = share.amount.currency.code(),
                admin = %actor.user,
                "escrow hold"
            );
            notify_detached(
                &self.notifier,
                share.seller.clone(),
                "Payment verified",
                format!("{} for order {} is held in escrow", share.amount.display(), order.id),
            );
        }
        Ok(order)
    }

    async fn try_hold(&self, order_id: &OrderId) -> Result<Order, MarketError> {
        let mut order = self.load_order(order_id).await?;
        if !order.value.status.is_fulfillment_phase() {
            // Let the state machine name the illegal move.
            order.value.status.transition_to(OrderStatus::FundsHeld)?;
        }

        let shares = order.value.seller_shares()?;
        if shares.is_empty() {
            return Err(MarketError::Validation(format!("order {} has no active lines", order_id)));
        }
        self.check_eligible(&shares).await?;

        order.value.mark_paid(Utc::now())?;
        order.value.transition_to(OrderStatus::FundsHeld)?;
        order.value.escrow = shares;

        let mut batch = Batch::new();
        self.stage_wallets(&order.value.escrow, Movement::Hold, &mut batch).await?;
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok(order.value)
    }

    /// Release escrow to the seller balances of a completed order.
    ///
    /// Fails with `OrderNotReady` unless the order is `completed`. The
    /// order moves to `paid` in the same commit as the wallet credits.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn release_funds(&self, actor: &Actor, order_id: &OrderId) -> Result<Order, MarketError> {
        actor.require_admin("release_funds")?;
        let (order, released) = retry_on_conflict("release_funds", || self.try_release(order_id)).await?;

        for share in &released {
            info!(
                target: AUDIT_TARGET,
                order_id = %order.id,
                seller = %share.seller,
                amount = share.amount.amount_minor,
                currency = share.amount.currency.code(),
                admin = %actor.user,
                "escrow release"
            );
            notify_detached(
                &self.notifier,
                share.seller.clone(),
                "Funds released",
                format!("{} from order {} is now in your balance", share.amount.display(), order.id),
            );
        }
        Ok(order)
    }

    async fn try_release(&self, order_id: &OrderId) -> Result<(Order, Vec<EscrowShare>), MarketError> {
        let mut order = self.load_order(order_id).await?;
        if order.value.status != OrderStatus::Completed {
            return Err(MarketError::OrderNotReady {
                order: order_id.clone(),
                status: order.value.status,
                expected: OrderStatus::Completed,
            });
        }
        let shares = std::mem::take(&mut order.value.escrow);
        self.check_eligible(&shares).await?;
        order.value.transition_to(OrderStatus::Paid)?;

        let mut batch = Batch::new();
        self.stage_wallets(&shares, Movement::Release, &mut batch).await?;
        batch.put(keys::order(order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok((order.value, shares))
    }

    /// Take a cancelled order's shares back out of escrow.
    ///
    /// Stages the wallet writes into `batch` and empties `order.escrow`;
    /// the caller commits them together with the order.
    pub(crate) async fn stage_reverse_hold(&self, order: &mut Order, batch: &mut Batch) -> Result<Vec<EscrowShare>, MarketError> {
        let shares = std::mem::take(&mut order.escrow);
        self.stage_wallets(&shares, Movement::Reverse, batch).await?;
        Ok(shares)
    }

    pub(crate) fn log_reversal(&self, order_id: &OrderId, shares: &[EscrowShare], actor: &Actor) {
        for share in shares {
            info!(
                target: AUDIT_TARGET,
                order_id = %order_id,
                seller = %share.seller,
                amount = share.amount.amount_minor,
                currency = share.amount.currency.code(),
                actor = %actor.user,
                "escrow reversal"
            );
        }
    }

    async fn load_order(&self, order_id: &OrderId) -> Result<Versioned<Order>, MarketError> {
        self.store
            .get::<Order>(&keys::order(order_id))
            .await?
            .ok_or_else(|| MarketError::OrderNotFound(order_id.clone()))
    }

    async fn check_eligible(&self, shares: &[EscrowShare]) -> Result<(), MarketError> {
        for share in shares {
            let eligible = self
                .catalog
                .seller(&share.seller)
                .await?
                .map(|s| s.is_payout_eligible())
                .unwrap_or(false);
            if !eligible {
                return Err(MarketError::SellerNotEligible(share.seller.clone()));
            }
        }
        Ok(())
    }

    async fn stage_wallets(&self, shares: &[EscrowShare], movement: Movement, batch: &mut Batch) -> Result<(), MarketError> {
        for share in shares {
            let key = keys::wallet(&share.seller);
            let current = self.store.get::<Wallet>(&key).await?;
            let expect = Expect::from_read(current.as_ref());

            let mut wallet = match (current, movement) {
                (Some(doc), _) => doc.value,
                (None, Movement::Hold) => Wallet::open(share.seller.clone(), share.amount.currency),
                (None, _) => {
                    return Err(MarketError::LedgerInvariant(format!(
                        "seller {} has escrow on record but no wallet",
                        share.seller
                    )))
                }
            };
            match movement {
                Movement::Hold => wallet.hold(share.amount)?,
                Movement::Release => wallet.release(share.amount)?,
                Movement::Reverse => wallet.reverse_hold(share.amount)?,
            }
            batch.put(key, &wallet, expect)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLedger")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}
