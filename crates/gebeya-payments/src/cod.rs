//! Cash on delivery.

use crate::provider::{ConfirmationEvent, Customer, Initiation, PaymentProvider, WebhookRequest};
use crate::PaymentError;
use async_trait::async_trait;
use gebeya_commerce::{Order, PaymentMethod, TxRef};

/// Cash on delivery has no gateway: initiation only issues a reference and
/// the payment stays pending until an admin verifies it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodProvider;

#[async_trait]
impl PaymentProvider for CodProvider {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cod
    }

    async fn initiate(&self, _order: &Order, _customer: &Customer) -> Result<Initiation, PaymentError> {
        Ok(Initiation {
            tx_ref: TxRef::generate(),
            redirect_url: None,
        })
    }

    fn parse_confirmation(&self, _request: &WebhookRequest) -> Result<ConfirmationEvent, PaymentError> {
        Err(PaymentError::Unsupported("COD"))
    }
}
