//! The provider contract and the normalized confirmation shape.

use crate::PaymentError;
use async_trait::async_trait;
use gebeya_commerce::{Money, Order, PaymentMethod, TxRef, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who is paying, as far as the gateway needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub user: UserId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            email: None,
            first_name: None,
            last_name: None,
            phone: None,
        }
    }
}

/// Result of starting a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiation {
    /// Reference the gateway will echo back in confirmations.
    pub tx_ref: TxRef,
    /// Where to send the buyer, for redirect gateways.
    pub redirect_url: Option<String>,
}

/// What the gateway says happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failed,
    /// Still in progress on the gateway side.
    Pending,
}

/// A confirmation normalized from any provider's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationEvent {
    /// The tx_ref issued at initiation.
    pub order_ref: TxRef,
    pub outcome: PaymentOutcome,
    /// Amount reported by the gateway, when it reports one.
    pub amount: Option<Money>,
    pub raw_payload: serde_json::Value,
}

/// An inbound webhook call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookRequest {
    /// Header names are stored lower-cased.
    headers: BTreeMap<String, String>,
    /// The raw body, exactly as received. Signatures cover these bytes.
    pub body: String,
}

impl WebhookRequest {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse the body as a JSON object.
    pub fn json_object(&self) -> Result<serde_json::Map<String, serde_json::Value>, PaymentError> {
        match serde_json::from_str::<serde_json::Value>(&self.body) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(PaymentError::MalformedPayload(
                "expected a JSON object".to_string(),
            )),
            Err(e) => Err(PaymentError::MalformedPayload(e.to_string())),
        }
    }
}

/// A payment method implementation.
///
/// Providers translate between the gateway's wire format and the
/// normalized types above. They never touch orders in the store.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// The payment method this provider serves.
    fn method(&self) -> PaymentMethod;

    /// Start a payment for `order`.
    async fn initiate(&self, order: &Order, customer: &Customer) -> Result<Initiation, PaymentError>;

    /// Authenticate and normalize a webhook call.
    fn parse_confirmation(&self, request: &WebhookRequest) -> Result<ConfirmationEvent, PaymentError>;

    /// Ask the gateway for the current state of a payment.
    async fn verify(&self, tx_ref: &TxRef) -> Result<ConfirmationEvent, PaymentError> {
        let _ = tx_ref;
        Err(PaymentError::Unsupported(self.method().as_str()))
    }
}

/// Read a string or number field as text.
pub(crate) fn field_str(
    fields: &serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Option<String> {
    match fields.get(name)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a gateway amount such as `"25.00"` or `25`.
///
/// An absent or null amount is `None`. An amount or currency that is
/// present but unreadable is a malformed payload.
pub(crate) fn parse_amount(
    fields: &serde_json::Map<String, serde_json::Value>,
    amount_field: &str,
    currency_field: Option<&str>,
    default_currency: gebeya_commerce::Currency,
) -> Result<Option<Money>, PaymentError> {
    if fields.get(amount_field).map_or(true, serde_json::Value::is_null) {
        return Ok(None);
    }
    let currency = match currency_field.and_then(|f| field_str(fields, f)) {
        Some(code) => gebeya_commerce::Currency::from_code(&code)
            .ok_or_else(|| PaymentError::MalformedPayload(format!("unknown currency {code}")))?,
        None => default_currency,
    };
    field_str(fields, amount_field)
        .and_then(|raw| Money::parse_decimal(&raw, currency))
        .map(Some)
        .ok_or_else(|| PaymentError::MalformedPayload(format!("unreadable {amount_field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_headers_case_insensitive() {
        let request = WebhookRequest::new("{}").with_header("X-Chapa-Signature", "abc");
        assert_eq!(request.header("x-chapa-signature"), Some("abc"));
        assert_eq!(request.header("X-CHAPA-SIGNATURE"), Some("abc"));
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        assert!(matches!(
            WebhookRequest::new("[1,2]").json_object(),
            Err(PaymentError::MalformedPayload(_))
        ));
        assert!(WebhookRequest::new("not json").json_object().is_err());
    }

    #[test]
    fn test_parse_amount_uses_currency_field() {
        let fields = serde_json::json!({"amount": "12.50", "currency": "USD"});
        let fields = fields.as_object().unwrap();
        let money = parse_amount(fields, "amount", Some("currency"), gebeya_commerce::Currency::ETB)
            .unwrap()
            .unwrap();
        assert_eq!(money, Money::new(1250, gebeya_commerce::Currency::USD));

        let fields = serde_json::json!({"totalAmount": 25});
        let money = parse_amount(fields.as_object().unwrap(), "totalAmount", None, gebeya_commerce::Currency::ETB)
            .unwrap()
            .unwrap();
        assert_eq!(money.amount_minor, 2500);
    }

    #[test]
    fn test_parse_amount_absent_vs_unreadable() {
        let etb = gebeya_commerce::Currency::ETB;
        let absent = serde_json::json!({"status": "success"});
        assert_eq!(parse_amount(absent.as_object().unwrap(), "amount", None, etb).unwrap(), None);
        let null = serde_json::json!({"amount": null});
        assert_eq!(parse_amount(null.as_object().unwrap(), "amount", None, etb).unwrap(), None);

        for raw in [serde_json::json!("1,000.00"), serde_json::json!("10.001"), serde_json::json!({"v": 1})] {
            let fields = serde_json::json!({ "amount": raw });
            assert!(matches!(
                parse_amount(fields.as_object().unwrap(), "amount", None, etb),
                Err(PaymentError::MalformedPayload(_))
            ));
        }

        let fields = serde_json::json!({"amount": "10.00", "currency": "XYZ"});
        assert!(matches!(
            parse_amount(fields.as_object().unwrap(), "amount", Some("currency"), etb),
            Err(PaymentError::MalformedPayload(_))
        ));
    }
}
