//! Market error types.

use gebeya_commerce::{CommerceError, ListingId, OrderId, OrderStatus, UserId};
use gebeya_payments::PaymentError;
use gebeya_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotAuthorized,
    Forbidden,
    NotFound,
    Conflict,
    ExternalService,
    Signature,
    Internal,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotAuthorized => "not_authorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ExternalService => "external_service",
            Self::Signature => "signature",
            Self::Internal => "internal",
        }
    }

    /// HTTP-equivalent status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation | Self::Signature => 400,
            Self::NotAuthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ExternalService => 502,
            Self::Internal => 500,
        }
    }
}

/// Errors surfaced by the marketplace services.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid product: {0}")]
    InvalidProduct(ListingId),

    #[error("cannot buy your own listing: {0}")]
    SelfPurchase(ListingId),

    #[error("delivery orders require an address")]
    MissingAddress,

    #[error("validation error: {0}")]
    Validation(String),

    /// The actor is not allowed to act on this resource.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The operation is reserved to admins.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("line item {product} not found on order {order}")]
    LineItemNotFound { order: OrderId, product: ListingId },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    IllegalTransition(CommerceError),

    #[error("order {order} is {status}, expected {expected}")]
    OrderNotReady {
        order: OrderId,
        status: OrderStatus,
        expected: OrderStatus,
    },

    #[error("seller {0} is not eligible for payouts")]
    SellerNotEligible(UserId),

    /// Concurrent updates kept winning after every retry.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),

    /// A payment gateway failed. Details are logged, never returned.
    #[error("payment gateway error, please try again")]
    PaymentGateway,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::EmptyCart
            | MarketError::InvalidProduct(_)
            | MarketError::SelfPurchase(_)
            | MarketError::MissingAddress
            | MarketError::Validation(_) => ErrorKind::Validation,
            MarketError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            MarketError::Forbidden(_) => ErrorKind::Forbidden,
            MarketError::OrderNotFound(_)
            | MarketError::LineItemNotFound { .. }
            | MarketError::NotFound(_) => ErrorKind::NotFound,
            MarketError::IllegalTransition(_)
            | MarketError::OrderNotReady { .. }
            | MarketError::SellerNotEligible(_)
            | MarketError::Conflict(_) => ErrorKind::Conflict,
            MarketError::PaymentGateway => ErrorKind::ExternalService,
            MarketError::InvalidSignature => ErrorKind::Signature,
            MarketError::LedgerInvariant(_) | MarketError::Internal(_) => ErrorKind::Internal,
            MarketError::Store(e) if e.is_conflict() => ErrorKind::Conflict,
            MarketError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    pub(crate) fn is_version_conflict(&self) -> bool {
        matches!(self, MarketError::Store(e) if e.is_conflict())
    }
}

impl From<CommerceError> for MarketError {
    fn from(e: CommerceError) -> Self {
        match e {
            CommerceError::IllegalTransition { .. } => MarketError::IllegalTransition(e),
            CommerceError::LedgerInvariant(msg) => MarketError::LedgerInvariant(msg),
            CommerceError::Overflow => MarketError::Internal(e.to_string()),
            other => MarketError::Validation(other.to_string()),
        }
    }
}

impl From<PaymentError> for MarketError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InvalidSignature(_) => MarketError::InvalidSignature,
            _ => MarketError::PaymentGateway,
        }
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        MarketError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(MarketError::EmptyCart.http_status(), 400);
        assert_eq!(MarketError::NotAuthorized("x".into()).http_status(), 401);
        assert_eq!(MarketError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(MarketError::OrderNotFound(OrderId::new("o")).http_status(), 404);
        assert_eq!(MarketError::PaymentGateway.http_status(), 502);
        assert_eq!(MarketError::InvalidSignature.http_status(), 400);
        assert_eq!(
            MarketError::OrderNotReady {
                order: OrderId::new("o"),
                status: OrderStatus::FundsHeld,
                expected: OrderStatus::Completed,
            }
            .http_status(),
            409
        );
    }

    #[test]
    fn test_commerce_error_mapping() {
        let illegal = CommerceError::IllegalTransition {
            entity: "order",
            from: "paid".into(),
            to: "pending".into(),
        };
        assert!(matches!(MarketError::from(illegal), MarketError::IllegalTransition(_)));
        assert!(matches!(
            MarketError::from(CommerceError::InvalidQuantity(0)),
            MarketError::Validation(_)
        ));
    }

    #[test]
    fn test_gateway_error_hides_details() {
        let err = MarketError::from(PaymentError::Http {
            status: 500,
            url: "https://api.chapa.co/v1/secret".into(),
        });
        assert!(!err.to_string().contains("chapa"));
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }

    #[test]
    fn test_store_conflict_is_conflict() {
        let err = MarketError::from(StoreError::VersionConflict {
            key: gebeya_store::DocKey::new("orders", "o"),
            expected: 1,
            found: 2,
        });
        assert!(err.is_version_conflict());
        assert_eq!(err.http_status(), 409);
    }
}
