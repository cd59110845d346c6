//! HMAC-SHA256 request and webhook signatures.

use crate::PaymentError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Fields never included in the signed string.
const UNSIGNED_FIELDS: [&str; 2] = ["sign", "sign_type"];

/// Hex HMAC-SHA256 of `data` under `secret`.
pub fn hmac_sha256_hex(secret: &str, data: &[u8]) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::NotConfigured("HMAC key error".to_string()))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex HMAC-SHA256 signature in constant time.
pub fn verify_hmac_sha256_hex(secret: &str, data: &[u8], signature: &str) -> Result<(), PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::NotConfigured("HMAC key error".to_string()))?;
    mac.update(data);

    let sig_bytes = hex::decode(signature.trim())
        .map_err(|_| PaymentError::InvalidSignature("signature is not hex".to_string()))?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| PaymentError::InvalidSignature("signature mismatch".to_string()))
}

/// Build the canonical `k1=v1&k2=v2` string of a flat JSON object.
///
/// Keys are sorted, `sign` and `sign_type` are skipped, nulls are dropped.
/// Strings are used verbatim, other values in their JSON form.
pub fn canonical_string(fields: &serde_json::Map<String, serde_json::Value>) -> String {
    let sorted: BTreeMap<&str, String> = fields
        .iter()
        .filter(|(k, v)| !UNSIGNED_FIELDS.contains(&k.as_str()) && !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.as_str(), value)
        })
        .collect();

    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign a flat JSON object with its canonical string.
pub fn sign_fields(
    secret: &str,
    fields: &serde_json::Map<String, serde_json::Value>,
) -> Result<String, PaymentError> {
    hmac_sha256_hex(secret, canonical_string(fields).as_bytes())
}

/// Verify the `sign` field of a flat JSON object.
pub fn verify_fields(
    secret: &str,
    fields: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), PaymentError> {
    let signature = fields
        .get("sign")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PaymentError::InvalidSignature("missing sign field".to_string()))?;
    verify_hmac_sha256_hex(secret, canonical_string(fields).as_bytes(), signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_canonical_string_sorted_and_filtered() {
        let fields = object(json!({
            "totalAmount": "25.00",
            "appId": "app",
            "sign": "abc",
            "sign_type": "HMAC-SHA256",
            "nonce": null,
            "count": 2
        }));
        assert_eq!(canonical_string(&fields), "appId=app&count=2&totalAmount=25.00");
    }

    #[test]
    fn test_known_hmac_vector() {
        // RFC 4231 test case 2
        let sig = hmac_sha256_hex("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_then_verify_fields() {
        let mut fields = object(json!({"outTradeNo": "tx_1", "tradeStatus": "Completed"}));
        let sign = sign_fields("secret", &fields).unwrap();
        fields.insert("sign".to_string(), json!(sign));
        assert!(verify_fields("secret", &fields).is_ok());

        fields.insert("tradeStatus".to_string(), json!("Failed"));
        assert!(verify_fields("secret", &fields).unwrap_err().is_signature_failure());
    }

    #[test]
    fn test_missing_or_garbled_signature() {
        let fields = object(json!({"outTradeNo": "tx_1"}));
        assert!(verify_fields("secret", &fields).unwrap_err().is_signature_failure());
        assert!(verify_hmac_sha256_hex("secret", b"x", "zz").unwrap_err().is_signature_failure());
    }
}
