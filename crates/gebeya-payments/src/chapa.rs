//! Chapa: redirect checkout confirmed by webhook or by polling.

use crate::policy::GatewayPolicy;
use crate::provider::{
    field_str, parse_amount, ConfirmationEvent, Customer, Initiation, PaymentOutcome,
    PaymentProvider, WebhookRequest,
};
use crate::signing::verify_hmac_sha256_hex;
use crate::transport::{send_with_policy, HttpRequest, HttpTransport};
use crate::PaymentError;
use async_trait::async_trait;
use gebeya_commerce::{Currency, Order, PaymentMethod, TxRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Signature headers Chapa may use, in lookup order.
const SIGNATURE_HEADERS: [&str; 2] = ["x-chapa-signature", "chapa-signature"];

fn default_base_url() -> String {
    "https://api.chapa.co".to_string()
}

/// Chapa gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer secret for the REST API.
    #[serde(default)]
    pub secret_key: String,
    /// When set, webhooks must carry a valid HMAC of the raw body.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub return_url: String,
    #[serde(default)]
    pub policy: GatewayPolicy,
}

impl Default for ChapaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            secret_key: String::new(),
            webhook_secret: None,
            callback_url: String::new(),
            return_url: String::new(),
            policy: GatewayPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChapaEnvelope {
    status: String,
    #[serde(default)]
    message: serde_json::Value,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Chapa provider.
pub struct ChapaProvider {
    config: ChapaConfig,
    transport: Arc<dyn HttpTransport>,
}

impl ChapaProvider {
    pub fn new(config: ChapaConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn require_secret(&self) -> Result<&str, PaymentError> {
        if self.config.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured("chapa secret_key".to_string()));
        }
        Ok(&self.config.secret_key)
    }

    fn outcome(status: &str) -> PaymentOutcome {
        match status.to_ascii_lowercase().as_str() {
            "success" | "successful" | "completed" => PaymentOutcome::Success,
            "failed" | "cancelled" | "canceled" | "expired" => PaymentOutcome::Failed,
            _ => PaymentOutcome::Pending,
        }
    }

    fn event_from_fields(
        fields: &serde_json::Map<String, serde_json::Value>,
        raw_payload: serde_json::Value,
    ) -> Result<ConfirmationEvent, PaymentError> {
        let tx_ref = field_str(fields, "tx_ref")
            .or_else(|| field_str(fields, "trx_ref"))
            .ok_or_else(|| PaymentError::MalformedPayload("missing tx_ref".to_string()))?;
        let status = field_str(fields, "status")
            .ok_or_else(|| PaymentError::MalformedPayload("missing status".to_string()))?;

        Ok(ConfirmationEvent {
            order_ref: TxRef::new(tx_ref),
            outcome: Self::outcome(&status),
            amount: parse_amount(fields, "amount", Some("currency"), Currency::ETB)?,
            raw_payload,
        })
    }
}

#[async_trait]
impl PaymentProvider for ChapaProvider {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Chapa
    }

    #[instrument(skip(self, order, customer), fields(order_id = %order.id))]
    async fn initiate(&self, order: &Order, customer: &Customer) -> Result<Initiation, PaymentError> {
        let secret = self.require_secret()?;
        let tx_ref = TxRef::generate();

        let body = serde_json::json!({
            "amount": order.total_price.to_decimal_string(),
            "currency": order.total_price.currency.code(),
            "email": customer.email,
            "first_name": customer.first_name,
            "last_name": customer.last_name,
            "phone_number": customer.phone,
            "tx_ref": tx_ref.as_str(),
            "callback_url": self.config.callback_url,
            "return_url": self.config.return_url,
            "customization": { "title": "Gebeya", "description": format!("Order {}", order.id) },
        });
        let request = HttpRequest::post_json(self.url("/v1/transaction/initialize"), body).bearer(secret);
        let response = send_with_policy(self.transport.as_ref(), request, &self.config.policy).await?;

        let envelope: ChapaEnvelope = response.json()?;
        if envelope.status != "success" {
            return Err(PaymentError::Rejected(envelope.message.to_string()));
        }
        let checkout_url = envelope
            .data
            .as_ref()
            .and_then(|d| d.get("checkout_url"))
            .and_then(|u| u.as_str())
            .ok_or_else(|| PaymentError::Deserialization("missing data.checkout_url".to_string()))?;

        info!(tx_ref = %tx_ref, "Chapa checkout initialized");
        Ok(Initiation {
            tx_ref,
            redirect_url: Some(checkout_url.to_string()),
        })
    }

    fn parse_confirmation(&self, request: &WebhookRequest) -> Result<ConfirmationEvent, PaymentError> {
        if let Some(secret) = self.config.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
            let signature = SIGNATURE_HEADERS
                .iter()
                .find_map(|h| request.header(h))
                .ok_or_else(|| PaymentError::InvalidSignature("missing Chapa signature header".to_string()))?;
            verify_hmac_sha256_hex(secret, request.body.as_bytes(), signature)?;
        }

        let fields = request.json_object()?;
        let raw_payload = serde_json::Value::Object(fields.clone());
        Self::event_from_fields(&fields, raw_payload)
    }

    #[instrument(skip(self))]
    async fn verify(&self, tx_ref: &TxRef) -> Result<ConfirmationEvent, PaymentError> {
        let secret = self.require_secret()?;
        let request = HttpRequest::get(self.url(&format!("/v1/transaction/verify/{}", tx_ref))).bearer(secret);
        let response = send_with_policy(self.transport.as_ref(), request, &self.config.policy).await?;

        let envelope: ChapaEnvelope = response.json()?;
        debug!(status = %envelope.status, "Chapa verify response");
        let data = envelope
            .data
            .clone()
            .ok_or_else(|| PaymentError::Deserialization("missing data".to_string()))?;
        let mut fields = data
            .as_object()
            .cloned()
            .ok_or_else(|| PaymentError::Deserialization("data is not an object".to_string()))?;
        fields
            .entry("tx_ref".to_string())
            .or_insert_with(|| serde_json::Value::String(tx_ref.to_string()));
        Self::event_from_fields(&fields, data)
    }
}
