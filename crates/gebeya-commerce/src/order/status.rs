//! Order, line and payment status state machines.
//!
//! Every status type carries an explicit transition table. Callers go
//! through `transition_to` and never assign a status directly.

use crate::error::CommerceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order-level status.
///
/// `pending`, `processing`, `shipped` and `delivered` are fulfillment
/// markers rolled up from the line items. `funds_held`, `completed` and
/// `paid` track the escrow lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    /// Buyer payment verified; seller share held in escrow.
    FundsHeld,
    /// Buyer confirmed receipt; escrow may be released.
    Completed,
    /// Escrow released to the seller wallet.
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::FundsHeld => "funds_held",
            OrderStatus::Completed => "completed",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "funds_held" => Some(OrderStatus::FundsHeld),
            "completed" => Some(OrderStatus::Completed),
            "paid" => Some(OrderStatus::Paid),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Statuses reachable from this one.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, Shipped, Delivered, FundsHeld, Cancelled],
            Processing => &[Shipped, Delivered, FundsHeld, Cancelled],
            Shipped => &[Delivered, FundsHeld, Cancelled],
            Delivered => &[FundsHeld, Cancelled],
            FundsHeld => &[Completed, Cancelled],
            Completed => &[Paid],
            Paid | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validate a transition, returning the new status.
    pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus, CommerceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CommerceError::IllegalTransition {
                entity: "order",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// Fulfillment markers: status still rolls up from line items.
    pub fn is_fulfillment_phase(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Processing
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single order line, driven by the buyer (proof upload) and
/// by the line's seller (fulfillment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    #[default]
    Pending,
    /// Buyer uploaded a payment proof. Advisory only.
    PaymentSubmitted,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Pending => "pending",
            LineStatus::PaymentSubmitted => "payment_submitted",
            LineStatus::Processing => "processing",
            LineStatus::Shipped => "shipped",
            LineStatus::Delivered => "delivered",
            LineStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LineStatus::Pending),
            "payment_submitted" => Some(LineStatus::PaymentSubmitted),
            "processing" => Some(LineStatus::Processing),
            "shipped" => Some(LineStatus::Shipped),
            "delivered" => Some(LineStatus::Delivered),
            "cancelled" => Some(LineStatus::Cancelled),
            _ => None,
        }
    }

    pub fn allowed_transitions(&self) -> &'static [LineStatus] {
        use LineStatus::*;
        match self {
            Pending => &[PaymentSubmitted, Processing, Cancelled],
            // Re-uploading a proof keeps the line in payment_submitted.
            PaymentSubmitted => &[PaymentSubmitted, Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: LineStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn transition_to(&self, next: LineStatus) -> Result<LineStatus, CommerceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CommerceError::IllegalTransition {
                entity: "line item",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// Statuses a seller may set through a fulfillment update.
    pub fn is_seller_settable(&self) -> bool {
        matches!(
            self,
            LineStatus::Processing
                | LineStatus::Shipped
                | LineStatus::Delivered
                | LineStatus::Cancelled
        )
    }

    /// The order-level fulfillment marker this line corresponds to.
    pub(crate) fn fulfillment_marker(&self) -> Option<OrderStatus> {
        match self {
            LineStatus::Pending | LineStatus::PaymentSubmitted => Some(OrderStatus::Pending),
            LineStatus::Processing => Some(OrderStatus::Processing),
            LineStatus::Shipped => Some(OrderStatus::Shipped),
            LineStatus::Delivered => Some(OrderStatus::Delivered),
            LineStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of the whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
        }
    }

    pub fn allowed_transitions(&self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Paid, Failed],
            Failed => &[Pending, Paid],
            Paid => &[],
        }
    }

    pub fn transition_to(&self, next: PaymentStatus) -> Result<PaymentStatus, CommerceError> {
        if self.allowed_transitions().contains(&next) {
            Ok(next)
        } else {
            Err(CommerceError::IllegalTransition {
                entity: "payment",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    #[serde(rename = "COD")]
    Cod,
    TeleBirr,
    Chapa,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::TeleBirr => "TeleBirr",
            PaymentMethod::Chapa => "Chapa",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cod" => Some(PaymentMethod::Cod),
            "telebirr" => Some(PaymentMethod::TeleBirr),
            "chapa" => Some(PaymentMethod::Chapa),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the goods reach the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Delivery => "delivery",
            DeliveryMethod::Pickup => "pickup",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "delivery" => Some(DeliveryMethod::Delivery),
            "pickup" => Some(DeliveryMethod::Pickup),
            _ => None,
        }
    }

    pub fn requires_address(&self) -> bool {
        matches!(self, DeliveryMethod::Delivery)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
