//! Payment error types.

use thiserror::Error;

/// Errors raised by payment providers and their transport.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),

    /// The gateway answered but refused the operation.
    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    /// A webhook or response signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A webhook body could not be understood.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The provider is missing required configuration.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The provider does not support this operation.
    #[error("Operation not supported by {0}")]
    Unsupported(&'static str),
}

impl PaymentError {
    /// Errors a caller may retry later without changing anything.
    pub fn is_transient(&self) -> bool {
        match self {
            PaymentError::Timeout(_) | PaymentError::Connection(_) => true,
            PaymentError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_signature_failure(&self) -> bool {
        matches!(self, PaymentError::InvalidSignature(_))
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(e: serde_json::Error) -> Self {
        PaymentError::Deserialization(e.to_string())
    }
}
