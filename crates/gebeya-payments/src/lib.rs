//! Payment provider adapters for Gebeya.
//!
//! This crate provides:
//! - `PaymentProvider` - one contract over every payment method
//! - `CodProvider`, `ChapaProvider`, `TeleBirrProvider` - the adapters
//! - `ConfirmationEvent` - provider payloads normalized to one shape
//! - `HttpTransport` - outbound HTTP with per-gateway timeout and retry
//! - HMAC-SHA256 signing helpers

mod chapa;
mod cod;
mod error;
mod policy;
mod provider;
pub mod signing;
mod telebirr;
mod transport;

pub use chapa::{ChapaConfig, ChapaProvider};
pub use cod::CodProvider;
pub use error::PaymentError;
pub use policy::{BackoffStrategy, GatewayPolicy, RetryPolicy, TimeoutConfig};
pub use provider::{
    ConfirmationEvent, Customer, Initiation, PaymentOutcome, PaymentProvider, WebhookRequest,
};
pub use telebirr::{TeleBirrConfig, TeleBirrProvider, SIGN_TYPE};
pub use transport::{
    send_with_policy, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
};
