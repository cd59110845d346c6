//! Gateway initiation and webhook reconciliation.

mod common;

use common::{etb, FakeGateway, Fixture};
use gebeya_market::prelude::*;
use gebeya_payments::signing::{hmac_sha256_hex, sign_fields};
use gebeya_payments::{
    ChapaConfig, ChapaProvider, Customer, GatewayPolicy, RetryPolicy, TeleBirrConfig,
    TeleBirrProvider, TimeoutConfig, WebhookRequest, SIGN_TYPE,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WEBHOOK_SECRET: &str = "chapa-hook-secret";
const APP_KEY: &str = "telebirr-app-key";

fn fast_policy() -> GatewayPolicy {
    GatewayPolicy::new(
        TimeoutConfig::new(Duration::from_millis(20), Duration::from_millis(50)),
        RetryPolicy::none(),
    )
}

fn chapa_config() -> ChapaConfig {
    ChapaConfig {
        base_url: "https://chapa.test".to_string(),
        secret_key: "CHASECK_TEST".to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        callback_url: "https://gebeya.test/webhooks/chapa".to_string(),
        return_url: "https://gebeya.test/orders".to_string(),
        policy: fast_policy(),
    }
}

fn telebirr_config() -> TeleBirrConfig {
    TeleBirrConfig {
        base_url: "https://telebirr.test/service-openup".to_string(),
        app_id: "app-1".to_string(),
        app_key: APP_KEY.to_string(),
        short_code: "500100".to_string(),
        notify_url: "https://gebeya.test/webhooks/telebirr".to_string(),
        timeout_express: "30".to_string(),
        policy: fast_policy(),
        ..Default::default()
    }
}

fn chapa_checkout_ok() -> Vec<Result<gebeya_payments::HttpResponse, gebeya_payments::PaymentError>> {
    vec![FakeGateway::json(
        200,
        json!({
            "status": "success",
            "message": "Hosted Link",
            "data": { "checkout_url": "https://checkout.chapa.test/pay/abc" }
        }),
    )]
}

async fn chapa_fixture(gateway: Arc<FakeGateway>) -> Fixture {
    let market = Marketplace::builder(Store::memory())
        .provider(Arc::new(ChapaProvider::new(chapa_config(), gateway)))
        .build();
    Fixture::with_market(market).await
}

async fn chapa_checkout(f: &Fixture, price: Money) -> Checkout {
    let listing = f.listing(&f.seller, "Ethiopian opal ring", price, 3).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Chapa)
        .with_lines(vec![LineRequest::new(listing.id, 1)]);
    f.market
        .payments
        .pay_with_provider(request, &Customer::new(f.buyer.clone()))
        .await
        .unwrap()
}

fn signed_chapa_webhook(body: serde_json::Value) -> WebhookRequest {
    let body = body.to_string();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, body.as_bytes()).unwrap();
    WebhookRequest::new(body).with_header("X-Chapa-Signature", signature)
}

#[tokio::test]
async fn test_chapa_checkout_records_reference() {
    let gateway = FakeGateway::answering(chapa_checkout_ok());
    let f = chapa_fixture(gateway.clone()).await;

    let checkout = chapa_checkout(&f, etb(250)).await;

    assert_eq!(checkout.redirect_url.as_deref(), Some("https://checkout.chapa.test/pay/abc"));
    assert!(checkout.order.payment_reference.is_some());
    assert_eq!(checkout.order.payment_status, PaymentStatus::Pending);
    assert_eq!(gateway.request_count(), 1);
}

#[tokio::test]
async fn test_chapa_webhook_success_is_idempotent() {
    let f = chapa_fixture(FakeGateway::answering(chapa_checkout_ok())).await;
    let checkout = chapa_checkout(&f, etb(250)).await;
    let tx_ref = checkout.order.payment_reference.clone().unwrap();
    let webhook = signed_chapa_webhook(json!({
        "tx_ref": tx_ref.as_str(),
        "status": "success",
        "amount": "250.00",
        "currency": "ETB",
    }));

    let first = f.market.payments.handle_webhook(PaymentMethod::Chapa, &webhook).await.unwrap();
    assert_eq!(first, WebhookAck::Applied { order_id: checkout.order.id.clone() });
    let after_first = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert!(after_first.is_paid);
    assert_eq!(after_first.payment_status, PaymentStatus::Paid);

    let second = f.market.payments.handle_webhook(PaymentMethod::Chapa, &webhook).await.unwrap();
    assert_eq!(second, WebhookAck::Duplicate { order_id: checkout.order.id.clone() });
    let after_second = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert_eq!(after_second, after_first);
}

#[tokio::test]
async fn test_bad_signature_is_ignored() {
    let f = chapa_fixture(FakeGateway::answering(chapa_checkout_ok())).await;
    let checkout = chapa_checkout(&f, etb(250)).await;
    let body = json!({
        "tx_ref": checkout.order.payment_reference.clone().unwrap().as_str(),
        "status": "success",
    })
    .to_string();
    let webhook = WebhookRequest::new(body).with_header("x-chapa-signature", "deadbeef");

    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &webhook).await.unwrap();
    assert!(matches!(ack, WebhookAck::Ignored { .. }));
    let order = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert!(!order.is_paid);
}

#[tokio::test]
async fn test_unknown_reference_and_amount_mismatch_are_ignored() {
    let f = chapa_fixture(FakeGateway::answering(chapa_checkout_ok())).await;
    let checkout = chapa_checkout(&f, etb(250)).await;

    let unknown = signed_chapa_webhook(json!({ "tx_ref": "tx_nope", "status": "success" }));
    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &unknown).await.unwrap();
    assert!(matches!(ack, WebhookAck::Ignored { .. }));

    let short = signed_chapa_webhook(json!({
        "tx_ref": checkout.order.payment_reference.clone().unwrap().as_str(),
        "status": "success",
        "amount": "1.00",
    }));
    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &short).await.unwrap();
    assert!(matches!(ack, WebhookAck::Ignored { .. }));
    let order = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_unreadable_amount_is_ignored() {
    let f = chapa_fixture(FakeGateway::answering(chapa_checkout_ok())).await;
    let checkout = chapa_checkout(&f, etb(250)).await;

    let webhook = signed_chapa_webhook(json!({
        "tx_ref": checkout.order.payment_reference.clone().unwrap().as_str(),
        "status": "success",
        "amount": "1,000.00",
        "currency": "ETB",
    }));
    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &webhook).await.unwrap();
    assert_eq!(ack, WebhookAck::Ignored { reason: "malformed payload".to_string() });
    let order = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert!(!order.is_paid);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_gateway_timeout_leaves_order_pending_without_reference() {
    let f = chapa_fixture(FakeGateway::hanging()).await;
    let listing = f.listing(&f.seller, "Leather bag", etb(90), 2).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Chapa)
        .with_lines(vec![LineRequest::new(listing.id, 1)]);

    let err = f
        .market
        .payments
        .pay_with_provider(request, &Customer::new(f.buyer.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::PaymentGateway));
    assert_eq!(err.http_status(), 502);

    let orders = f.market.orders.orders_for_buyer(&f.buyer).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].payment_status, PaymentStatus::Pending);
    assert!(orders[0].payment_reference.is_none());
}

#[tokio::test]
async fn test_failed_payment_can_be_retried() {
    let mut responses = chapa_checkout_ok();
    responses.extend(chapa_checkout_ok());
    let f = chapa_fixture(FakeGateway::answering(responses)).await;
    let checkout = chapa_checkout(&f, etb(60)).await;
    let first_ref = checkout.order.payment_reference.clone().unwrap();

    let failed = signed_chapa_webhook(json!({ "tx_ref": first_ref.as_str(), "status": "failed" }));
    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &failed).await.unwrap();
    assert!(ack.is_applied());
    let order = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);

    let retried = f
        .market
        .payments
        .retry_payment(&checkout.order.id, &Customer::new(f.buyer.clone()))
        .await
        .unwrap();
    let second_ref = retried.order.payment_reference.clone().unwrap();
    assert_ne!(second_ref, first_ref);
    assert_eq!(retried.order.payment_status, PaymentStatus::Pending);

    let paid = signed_chapa_webhook(json!({ "tx_ref": second_ref.as_str(), "status": "success" }));
    let ack = f.market.payments.handle_webhook(PaymentMethod::Chapa, &paid).await.unwrap();
    assert!(ack.is_applied());
}

#[tokio::test]
async fn test_cod_checkout_has_no_redirect() {
    let f = Fixture::new().await;
    let listing = f.listing(&f.seller, "Spices", etb(12), 9).await;
    f.market.carts.add_item(&f.buyer, &listing.id, 1).await.unwrap();

    let checkout = f
        .market
        .payments
        .pay_with_cod(&f.buyer, NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Chapa))
        .await
        .unwrap();
    assert!(checkout.redirect_url.is_none());
    assert_eq!(checkout.order.payment_method, PaymentMethod::Cod);
    assert_eq!(checkout.order.payment_status, PaymentStatus::Pending);

    let ack = f
        .market
        .payments
        .handle_webhook(PaymentMethod::Cod, &WebhookRequest::new("{}"))
        .await
        .unwrap();
    assert!(matches!(ack, WebhookAck::Ignored { .. }));
}

#[tokio::test]
async fn test_telebirr_signed_notification_applies() {
    let gateway = FakeGateway::answering(vec![FakeGateway::json(
        200,
        json!({ "code": 0, "message": "ok", "data": { "toPayUrl": "https://telebirr.test/pay/1" } }),
    )]);
    let market = Marketplace::builder(Store::memory())
        .provider(Arc::new(TeleBirrProvider::new(telebirr_config(), gateway)))
        .build();
    let f = Fixture::with_market(market).await;
    let listing = f.listing(&f.seller, "Traditional dress", etb(1200), 1).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::TeleBirr)
        .with_lines(vec![LineRequest::new(listing.id, 1)]);
    let checkout = f
        .market
        .payments
        .pay_with_provider(request, &Customer::new(f.buyer.clone()))
        .await
        .unwrap();
    assert_eq!(checkout.redirect_url.as_deref(), Some("https://telebirr.test/pay/1"));
    let tx_ref = checkout.order.payment_reference.clone().unwrap();

    let mut fields = json!({
        "outTradeNo": tx_ref.as_str(),
        "tradeStatus": "Completed",
        "totalAmount": "1200.00",
        "transactionNo": "TB123",
    })
    .as_object()
    .cloned()
    .unwrap();
    let sign = sign_fields(APP_KEY, &fields).unwrap();
    fields.insert("sign".to_string(), sign.into());
    fields.insert("sign_type".to_string(), SIGN_TYPE.into());
    let notify = WebhookRequest::new(serde_json::Value::Object(fields.clone()).to_string());

    let ack = f.market.payments.handle_webhook(PaymentMethod::TeleBirr, &notify).await.unwrap();
    assert!(ack.is_applied());

    fields.insert("totalAmount".to_string(), "1.00".into());
    let tampered = WebhookRequest::new(serde_json::Value::Object(fields).to_string());
    let ack = f.market.payments.handle_webhook(PaymentMethod::TeleBirr, &tampered).await.unwrap();
    assert_eq!(ack, WebhookAck::Ignored { reason: "invalid signature".to_string() });
}

#[tokio::test]
async fn test_verify_payment_polls_gateway() {
    let mut responses = chapa_checkout_ok();
    responses.push(FakeGateway::json(
        200,
        json!({
            "status": "success",
            "message": "Payment details",
            "data": { "status": "success", "amount": "250.00", "currency": "ETB" }
        }),
    ));
    let f = chapa_fixture(FakeGateway::answering(responses)).await;
    let checkout = chapa_checkout(&f, etb(250)).await;
    let tx_ref = checkout.order.payment_reference.clone().unwrap();

    let err = f
        .market
        .payments
        .verify_payment(&Actor::member("usr_stranger"), &tx_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NotAuthorized(_)));

    let ack = f.market.payments.verify_payment(&f.buyer_actor(), &tx_ref).await.unwrap();
    assert!(ack.is_applied());
    let order = f.market.orders.get_order(&f.admin, &checkout.order.id).await.unwrap();
    assert!(order.is_paid);
}
