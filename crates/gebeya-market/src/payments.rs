//! Payment reconciliation.
//!
//! Bridges the provider adapters and the order engine: starts payments,
//! records the gateway reference on the order, and applies normalized
//! confirmations exactly once per tx_ref.

use crate::actor::Actor;
use crate::keys;
use crate::orders::{NewOrder, OrderEngine};
use crate::ports::{notify_detached, Notifier};
use crate::retry::retry_on_conflict;
use crate::MarketError;
use chrono::{DateTime, Utc};
use gebeya_commerce::{Order, OrderId, PaymentMethod, PaymentStatus, TxRef, UserId};
use gebeya_payments::{
    ConfirmationEvent, Customer, Initiation, PaymentError, PaymentOutcome, PaymentProvider,
    WebhookRequest,
};
use gebeya_store::{Batch, Expect, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Index document mapping a gateway tx_ref back to its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRef {
    pub tx_ref: TxRef,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

/// Result of starting a payment.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub order: Order,
    /// Gateway page the buyer must visit. `None` for COD.
    pub redirect_url: Option<String>,
}

/// How a confirmation was handled. Webhook callers always get one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookAck {
    /// The order's payment state changed.
    Applied { order_id: OrderId },
    /// The confirmation was already applied.
    Duplicate { order_id: OrderId },
    /// Nothing changed.
    Ignored { reason: String },
}

impl WebhookAck {
    fn ignored(reason: impl Into<String>) -> Self {
        WebhookAck::Ignored {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, WebhookAck::Applied { .. })
    }
}

/// Payment service.
#[derive(Clone)]
pub struct PaymentService {
    store: Store,
    orders: OrderEngine,
    providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentService {
    pub fn new(store: Store, orders: OrderEngine, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            orders,
            providers: HashMap::new(),
            notifier,
        }
    }

    /// Register a provider under its own payment method.
    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(provider.method(), provider);
        self
    }

    pub fn supports(&self, method: PaymentMethod) -> bool {
        self.providers.contains_key(&method)
    }

    fn provider(&self, method: PaymentMethod) -> Result<&Arc<dyn PaymentProvider>, MarketError> {
        self.providers
            .get(&method)
            .ok_or_else(|| MarketError::Validation(format!("payment method {method} is not configured")))
    }

    /// Check out with cash on delivery.
    ///
    /// The payment stays pending until an admin verifies it.
    pub async fn pay_with_cod(&self, buyer: &UserId, request: NewOrder) -> Result<Checkout, MarketError> {
        let request = NewOrder {
            payment_method: PaymentMethod::Cod,
            ..request
        };
        let order = self.orders.create_order(buyer, &request).await?;
        self.start_payment(order, &Customer::new(buyer.clone())).await
    }

    /// Create an order and start a gateway payment for it.
    ///
    /// If the gateway fails the order is kept, pending and without a
    /// reference, and can be retried with [`PaymentService::retry_payment`].
    pub async fn pay_with_provider(
        &self,
        request: NewOrder,
        customer: &Customer,
    ) -> Result<Checkout, MarketError> {
        if request.payment_method == PaymentMethod::Cod {
            return Err(MarketError::Validation(
                "use cash on delivery checkout for COD orders".to_string(),
            ));
        }
        self.provider(request.payment_method)?;

        let order = self.orders.create_order(&customer.user, &request).await?;
        self.start_payment(order, customer).await
    }

    /// Start a new payment attempt for an unpaid order.
    #[instrument(skip(self, customer), fields(buyer = %customer.user))]
    pub async fn retry_payment(&self, order_id: &OrderId, customer: &Customer) -> Result<Checkout, MarketError> {
        let mut order = self.orders.load_order(order_id).await?;
        if order.value.buyer != customer.user {
            return Err(MarketError::NotAuthorized(format!("order {order_id} belongs to another buyer")));
        }
        if order.value.payment_status == PaymentStatus::Paid || order.value.status.is_terminal() {
            return Err(MarketError::Validation(format!(
                "order {order_id} cannot take a new payment"
            )));
        }

        if order.value.payment_status == PaymentStatus::Failed {
            order.value.reopen_payment()?;
            let mut batch = Batch::new();
            batch.put(keys::order(order_id), &order.value, order.expect())?;
            self.store.commit(batch).await?;
        }
        self.start_payment(order.value, customer).await
    }

    #[instrument(skip(self, order, customer), fields(order_id = %order.id, method = %order.payment_method))]
    async fn start_payment(&self, order: Order, customer: &Customer) -> Result<Checkout, MarketError> {
        let provider = self.provider(order.payment_method)?;
        let Initiation { tx_ref, redirect_url } = match provider.initiate(&order, customer).await {
            Ok(initiation) => initiation,
            Err(e) => {
                error!(error = %e, transient = e.is_transient(), "Payment initiation failed");
                return Err(MarketError::PaymentGateway);
            }
        };

        let order = retry_on_conflict("record_payment_reference", || {
            self.try_record_reference(&order.id, &tx_ref)
        })
        .await?;

        info!(tx_ref = %tx_ref, redirect = redirect_url.is_some(), "Payment initiated");
        Ok(Checkout { order, redirect_url })
    }

    async fn try_record_reference(&self, order_id: &OrderId, tx_ref: &TxRef) -> Result<Order, MarketError> {
        let mut order = self.orders.load_order(order_id).await?;
        order.value.record_payment_reference(tx_ref.clone());

        let index = PaymentRef {
            tx_ref: tx_ref.clone(),
            order_id: order_id.clone(),
            method: order.value.payment_method,
            created_at: Utc::now(),
        };
        let mut batch = Batch::new();
        batch
            .put(keys::order(order_id), &order.value, order.expect())?
            .put(keys::payment_ref(tx_ref), &index, Expect::Absent)?;
        self.store.commit(batch).await?;
        Ok(order.value)
    }

    /// Authenticate, normalize and apply a gateway webhook.
    ///
    /// Never fails on bad input: signature and payload problems are logged
    /// and acknowledged as [`WebhookAck::Ignored`]. Only store failures
    /// surface as errors.
    #[instrument(skip(self, request), fields(method = %method))]
    pub async fn handle_webhook(&self, method: PaymentMethod, request: &WebhookRequest) -> Result<WebhookAck, MarketError> {
        let provider = match self.provider(method) {
            Ok(p) => p,
            Err(_) => return Ok(WebhookAck::ignored(format!("no provider for {method}"))),
        };
        let event = match provider.parse_confirmation(request) {
            Ok(event) => event,
            Err(e) => return Ok(Self::rejected_payload(&e)),
        };
        self.apply_confirmation(method, &event).await
    }

    fn rejected_payload(e: &PaymentError) -> WebhookAck {
        if e.is_signature_failure() {
            warn!(error = %e, "Webhook signature rejected");
            WebhookAck::ignored("invalid signature")
        } else {
            warn!(error = %e, "Webhook payload rejected");
            WebhookAck::ignored("malformed payload")
        }
    }

    /// Poll the gateway for a payment and apply the answer.
    #[instrument(skip(self, actor), fields(actor = %actor.user))]
    pub async fn verify_payment(&self, actor: &Actor, tx_ref: &TxRef) -> Result<WebhookAck, MarketError> {
        let index = self
            .store
            .get::<PaymentRef>(&keys::payment_ref(tx_ref))
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("payment {tx_ref}")))?
            .value;
        if !actor.is_admin() {
            let order = self.orders.load_order(&index.order_id).await?;
            if order.value.buyer != actor.user {
                return Err(MarketError::NotAuthorized(format!("payment {tx_ref} is not yours")));
            }
        }

        let provider = self.provider(index.method)?;
        let event = match provider.verify(tx_ref).await {
            Ok(event) => event,
            Err(PaymentError::Unsupported(method)) => {
                return Err(MarketError::Validation(format!("{method} payments cannot be polled")));
            }
            Err(e) => {
                error!(error = %e, "Payment verification failed");
                return Err(MarketError::PaymentGateway);
            }
        };
        self.apply_confirmation(index.method, &event).await
    }

    /// Apply a normalized confirmation to its order.
    ///
    /// Idempotent on tx_ref: a success already applied yields
    /// [`WebhookAck::Duplicate`] and writes nothing.
    pub async fn apply_confirmation(&self, method: PaymentMethod, event: &ConfirmationEvent) -> Result<WebhookAck, MarketError> {
        let ack = retry_on_conflict("apply_confirmation", || self.try_apply(method, event)).await?;

        match &ack {
            WebhookAck::Applied { order_id } => {
                info!(order_id = %order_id, tx_ref = %event.order_ref, outcome = ?event.outcome, "Payment confirmation applied");
                if let Ok(order) = self.orders.load_order(order_id).await {
                    let body = match event.outcome {
                        PaymentOutcome::Success => format!("Payment for order {order_id} was received"),
                        _ => format!("Payment for order {order_id} failed, you can try again"),
                    };
                    notify_detached(&self.notifier, order.value.buyer, "Payment update", body);
                }
            }
            WebhookAck::Duplicate { order_id } => {
                info!(order_id = %order_id, tx_ref = %event.order_ref, "Duplicate payment confirmation");
            }
            WebhookAck::Ignored { reason } => {
                warn!(tx_ref = %event.order_ref, reason = %reason, "Payment confirmation ignored");
            }
        }
        Ok(ack)
    }

    async fn try_apply(&self, method: PaymentMethod, event: &ConfirmationEvent) -> Result<WebhookAck, MarketError> {
        let Some(index) = self
            .store
            .get::<PaymentRef>(&keys::payment_ref(&event.order_ref))
            .await?
        else {
            return Ok(WebhookAck::ignored(format!("unknown tx_ref {}", event.order_ref)));
        };
        let index = index.value;
        if index.method != method {
            return Ok(WebhookAck::ignored(format!(
                "tx_ref {} belongs to {}",
                event.order_ref, index.method
            )));
        }

        let mut order = self.orders.load_order(&index.order_id).await?;
        if let Some(amount) = &event.amount {
            if amount != &order.value.total_price {
                return Ok(WebhookAck::ignored(format!(
                    "amount {} does not match order total {}",
                    amount, order.value.total_price
                )));
            }
        }

        let order_id = index.order_id.clone();
        let changed = match event.outcome {
            PaymentOutcome::Pending => return Ok(WebhookAck::ignored("payment still pending")),
            PaymentOutcome::Success => order.value.mark_paid(Utc::now())?,
            PaymentOutcome::Failed => {
                if order.value.payment_status == PaymentStatus::Paid {
                    return Ok(WebhookAck::ignored("order is already paid"));
                }
                order.value.mark_payment_failed()?
            }
        };
        if !changed {
            return Ok(WebhookAck::Duplicate { order_id });
        }

        let mut batch = Batch::new();
        batch.put(keys::order(&order_id), &order.value, order.expect())?;
        self.store.commit(batch).await?;
        Ok(WebhookAck::Applied { order_id })
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.providers.keys().map(|m| m.as_str()).collect();
        methods.sort_unstable();
        f.debug_struct("PaymentService")
            .field("providers", &methods)
            .finish_non_exhaustive()
    }
}
