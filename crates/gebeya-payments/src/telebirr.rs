//! TeleBirr: signed web checkout confirmed by signed notifications.
//!
//! Outbound requests and inbound notifications are signed with HMAC-SHA256
//! over the sorted `key=value` pairs of the payload joined with `&`,
//! leaving out `sign` and `sign_type`.

use crate::policy::GatewayPolicy;
use crate::provider::{
    field_str, parse_amount, ConfirmationEvent, Customer, Initiation, PaymentOutcome,
    PaymentProvider, WebhookRequest,
};
use crate::signing::{sign_fields, verify_fields};
use crate::transport::{send_with_policy, HttpRequest, HttpTransport};
use crate::PaymentError;
use async_trait::async_trait;
use gebeya_commerce::{Currency, Order, PaymentMethod, TxRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

pub const SIGN_TYPE: &str = "HMAC-SHA256";

/// `tradeStatus` values that mean the buyer paid.
const SUCCESS_STATUSES: [&str; 3] = ["Completed", "SUCCESS", "PAY_SUCCESS"];
const FAILED_STATUSES: [&str; 4] = ["Failed", "FAILED", "PAY_FAILED", "Expired"];

fn default_timeout_express() -> String {
    "30".to_string()
}

/// TeleBirr gateway settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeleBirrConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
    /// Shared signing secret.
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub short_code: String,
    #[serde(default)]
    pub notify_url: String,
    #[serde(default)]
    pub return_url: String,
    #[serde(default)]
    pub receive_name: String,
    /// Minutes before an unpaid checkout expires.
    #[serde(default = "default_timeout_express")]
    pub timeout_express: String,
    #[serde(default)]
    pub policy: GatewayPolicy,
}

/// TeleBirr provider.
pub struct TeleBirrProvider {
    config: TeleBirrConfig,
    transport: Arc<dyn HttpTransport>,
}

impl TeleBirrProvider {
    pub fn new(config: TeleBirrConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    fn require_config(&self) -> Result<(), PaymentError> {
        for (name, value) in [
            ("base_url", &self.config.base_url),
            ("app_id", &self.config.app_id),
            ("app_key", &self.config.app_key),
        ] {
            if value.is_empty() {
                return Err(PaymentError::NotConfigured(format!("telebirr {}", name)));
            }
        }
        Ok(())
    }

    /// Build the signed checkout payload for an order.
    pub fn checkout_payload(
        &self,
        order: &Order,
        tx_ref: &TxRef,
    ) -> Result<serde_json::Map<String, serde_json::Value>, PaymentError> {
        let payload = serde_json::json!({
            "appId": self.config.app_id,
            "nonce": uuid::Uuid::new_v4().simple().to_string(),
            "notifyUrl": self.config.notify_url,
            "outTradeNo": tx_ref.as_str(),
            "receiveName": self.config.receive_name,
            "returnUrl": self.config.return_url,
            "shortCode": self.config.short_code,
            "subject": format!("Order {}", order.id),
            "timeoutExpress": self.config.timeout_express,
            "timestamp": chrono::Utc::now().timestamp_millis().to_string(),
            "totalAmount": order.total_price.to_decimal_string(),
        });
        let mut fields = match payload {
            serde_json::Value::Object(map) => map,
            _ => return Err(PaymentError::Request("payload is not an object".to_string())),
        };
        let sign = sign_fields(&self.config.app_key, &fields)?;
        fields.insert("sign".to_string(), sign.into());
        fields.insert("sign_type".to_string(), SIGN_TYPE.into());
        Ok(fields)
    }

    fn outcome(status: &str) -> PaymentOutcome {
        if SUCCESS_STATUSES.contains(&status) {
            PaymentOutcome::Success
        } else if FAILED_STATUSES.contains(&status) {
            PaymentOutcome::Failed
        } else {
            PaymentOutcome::Pending
        }
    }
}

#[async_trait]
impl PaymentProvider for TeleBirrProvider {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::TeleBirr
    }

    #[instrument(skip(self, order, _customer), fields(order_id = %order.id))]
    async fn initiate(&self, order: &Order, _customer: &Customer) -> Result<Initiation, PaymentError> {
        self.require_config()?;
        let tx_ref = TxRef::generate();
        let payload = self.checkout_payload(order, &tx_ref)?;

        let url = format!("{}/toTradeWebPay", self.config.base_url.trim_end_matches('/'));
        let request = HttpRequest::post_json(url, serde_json::Value::Object(payload));
        let response = send_with_policy(self.transport.as_ref(), request, &self.config.policy).await?;

        let body: serde_json::Value = response.json()?;
        let code = body.get("code").map(|c| match c {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        if !matches!(code.as_deref(), Some("0") | Some("200")) {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(PaymentError::Rejected(message.to_string()));
        }
        let pay_url = body
            .pointer("/data/toPayUrl")
            .and_then(|u| u.as_str())
            .ok_or_else(|| PaymentError::Deserialization("missing data.toPayUrl".to_string()))?;

        info!(tx_ref = %tx_ref, "TeleBirr checkout initialized");
        Ok(Initiation {
            tx_ref,
            redirect_url: Some(pay_url.to_string()),
        })
    }

    fn parse_confirmation(&self, request: &WebhookRequest) -> Result<ConfirmationEvent, PaymentError> {
        if self.config.app_key.is_empty() {
            return Err(PaymentError::NotConfigured("telebirr app_key".to_string()));
        }
        let fields = request.json_object()?;
        verify_fields(&self.config.app_key, &fields)?;

        let out_trade_no = field_str(&fields, "outTradeNo")
            .ok_or_else(|| PaymentError::MalformedPayload("missing outTradeNo".to_string()))?;
        let status = field_str(&fields, "tradeStatus")
            .ok_or_else(|| PaymentError::MalformedPayload("missing tradeStatus".to_string()))?;

        Ok(ConfirmationEvent {
            order_ref: TxRef::new(out_trade_no),
            outcome: Self::outcome(&status),
            amount: parse_amount(&fields, "totalAmount", Some("currency"), Currency::ETB)?,
            raw_payload: serde_json::Value::Object(fields),
        })
    }
}
