//! Order creation, proofs and seller fulfillment.

mod common;

use common::{etb, Fixture};
use gebeya_market::prelude::*;
use gebeya_market::MemoryProofStorage;
use std::sync::Arc;

#[tokio::test]
async fn test_cart_checkout_snapshots_totals_and_empties_cart() {
    let f = Fixture::new().await;
    let coffee = f.listing(&f.seller, "Yirgacheffe coffee 1kg", etb(10), 5).await;
    let cup = f.listing(&f.seller, "Sini cup", etb(5), 5).await;
    f.market.carts.add_item(&f.buyer, &coffee.id, 2).await.unwrap();
    f.market.carts.add_item(&f.buyer, &cup.id, 1).await.unwrap();

    let order = f
        .market
        .orders
        .create_order(&f.buyer, &NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod))
        .await
        .unwrap();

    assert_eq!(order.total_price, etb(25));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(!order.is_paid);
    assert_eq!(order.products.len(), 2);
    assert!(f.market.carts.cart(&f.buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let f = Fixture::new().await;
    let err = f
        .market
        .orders
        .create_order(&f.buyer, &NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::EmptyCart));
}

#[tokio::test]
async fn test_totals_immune_to_later_reprice() {
    let f = Fixture::new().await;
    let listing = f.listing(&f.seller, "Gabi blanket", etb(40), 3).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new(listing.id.clone(), 2)]);
    let order = f.market.orders.create_order(&f.buyer, &request).await.unwrap();

    f.market
        .catalog
        .reprice(&Actor::member(f.seller.clone()), &listing.id, etb(99))
        .await
        .unwrap();

    let reread = f.market.orders.get_order(&f.buyer_actor(), &order.id).await.unwrap();
    assert_eq!(reread.total_price, etb(80));
    assert_eq!(reread.products[0].price, etb(40));
}

#[tokio::test]
async fn test_self_purchase_rejected() {
    let f = Fixture::new().await;
    let listing = f.listing(&f.seller, "Berbere 500g", etb(3), 10).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new(listing.id.clone(), 1)]);

    let err = f.market.orders.create_order(&f.seller, &request).await.unwrap_err();
    assert!(matches!(err, MarketError::SelfPurchase(id) if id == listing.id));
}

#[tokio::test]
async fn test_unknown_product_and_bad_quantity() {
    let f = Fixture::new().await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new("lst_missing", 1)]);
    let err = f.market.orders.create_order(&f.buyer, &request).await.unwrap_err();
    assert!(matches!(err, MarketError::InvalidProduct(_)));

    let listing = f.listing(&f.seller, "Shemma scarf", etb(12), 4).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new(listing.id, 0)]);
    let err = f.market.orders.create_order(&f.buyer, &request).await.unwrap_err();
    assert!(matches!(err, MarketError::Validation(_)));
    assert!(f.market.orders.orders_for_buyer(&f.buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delivery_requires_address_pickup_does_not() {
    let f = Fixture::new().await;
    let listing = f.listing(&f.seller, "Clay jebena", etb(15), 4).await;
    let lines = vec![LineRequest::new(listing.id.clone(), 1)];

    let delivery = NewOrder::from_cart(DeliveryMethod::Delivery, PaymentMethod::Cod).with_lines(lines.clone());
    let err = f.market.orders.create_order(&f.buyer, &delivery).await.unwrap_err();
    assert!(matches!(err, MarketError::MissingAddress));

    let pickup = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod).with_lines(lines.clone());
    let order = f.market.orders.create_order(&f.buyer, &pickup).await.unwrap();
    assert!(order.address.is_none());

    let address = f.address(&f.buyer).await;
    let delivery = delivery.with_address(address.id.clone());
    let order = f.market.orders.create_order(&f.buyer, &delivery).await.unwrap();
    assert_eq!(order.address, Some(address.id));
}

#[tokio::test]
async fn test_someone_elses_address_is_not_found() {
    let f = Fixture::new().await;
    let listing = f.listing(&f.seller, "Clay jebena", etb(15), 4).await;
    let stranger = f.address(&UserId::new("usr_stranger")).await;

    let request = NewOrder::from_cart(DeliveryMethod::Delivery, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new(listing.id, 1)])
        .with_address(stranger.id);
    let err = f.market.orders.create_order(&f.buyer, &request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_payment_proof_marks_line_submitted() {
    let proofs = Arc::new(MemoryProofStorage::new());
    let market = Marketplace::builder(Store::memory()).proof_storage(proofs.clone()).build();
    let f = Fixture::with_market(market).await;
    let order = f.pickup_order(etb(50)).await;
    let product = order.products[0].product_id.clone();
    let upload = ProofUpload {
        file_name: "receipt.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xff, 0xd8, 0xff],
    };

    let err = f
        .market
        .orders
        .upload_payment_proof(&UserId::new("usr_other"), &order.id, &product, upload.clone(), "FT123")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NotAuthorized(_)));
    assert!(proofs.is_empty().await);

    let updated = f
        .market
        .orders
        .upload_payment_proof(&f.buyer, &order.id, &product, upload, "FT123")
        .await
        .unwrap();
    let line = &updated.products[0];
    assert_eq!(line.status, LineStatus::PaymentSubmitted);
    assert_eq!(line.payment_proof.as_ref().unwrap().transaction_id, "FT123");
    assert_eq!(updated.payment_status, PaymentStatus::Pending);
    assert_eq!(proofs.len().await, 1);
}

#[tokio::test]
async fn test_payment_proof_validation() {
    let f = Fixture::new().await;
    let order = f.pickup_order(etb(50)).await;
    let upload = ProofUpload {
        file_name: "receipt.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
    };

    let err = f
        .market
        .orders
        .upload_payment_proof(&f.buyer, &order.id, &order.products[0].product_id, upload.clone(), "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Validation(_)));

    let err = f
        .market
        .orders
        .upload_payment_proof(&f.buyer, &order.id, &ListingId::new("lst_other"), upload.clone(), "FT1")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::LineItemNotFound { .. }));

    let err = f
        .market
        .orders
        .upload_payment_proof(&f.buyer, &OrderId::new("ord_missing"), &order.products[0].product_id, upload, "FT1")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_seller_status_rolls_up_per_seller() {
    let f = Fixture::new().await;
    let other_seller = UserId::new("usr_seller_2");
    f.add_seller(&other_seller, SellerStatus::Approved).await;
    let a = f.listing(&f.seller, "Injera mitad", etb(30), 2).await;
    let b = f.listing(&other_seller, "Netela", etb(20), 2).await;
    let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
        .with_lines(vec![LineRequest::new(a.id.clone(), 1), LineRequest::new(b.id.clone(), 1)]);
    let order = f.market.orders.create_order(&f.buyer, &request).await.unwrap();

    let order_after = f
        .market
        .orders
        .change_order_status(&order.id, &f.seller, LineStatus::Processing)
        .await
        .unwrap();
    assert_eq!(order_after.line(&a.id).unwrap().status, LineStatus::Processing);
    assert_eq!(order_after.line(&b.id).unwrap().status, LineStatus::Pending);
    assert_eq!(order_after.status, OrderStatus::Pending);

    let order_after = f
        .market
        .orders
        .change_order_status(&order.id, &other_seller, LineStatus::Processing)
        .await
        .unwrap();
    assert_eq!(order_after.status, OrderStatus::Processing);

    let err = f
        .market
        .orders
        .change_order_status(&order.id, &UserId::new("usr_nobody"), LineStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::OrderNotFound(_)));

    let err = f
        .market
        .orders
        .change_order_status(&order.id, &f.seller, LineStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::IllegalTransition(_)));
}

#[tokio::test]
async fn test_order_visibility() {
    let f = Fixture::new().await;
    let order = f.pickup_order(etb(10)).await;

    assert!(f.market.orders.get_order(&f.buyer_actor(), &order.id).await.is_ok());
    assert!(f.market.orders.get_order(&Actor::member(f.seller.clone()), &order.id).await.is_ok());
    assert!(f.market.orders.get_order(&f.admin, &order.id).await.is_ok());
    let err = f
        .market
        .orders
        .get_order(&Actor::member("usr_stranger"), &order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NotAuthorized(_)));

    assert_eq!(f.market.orders.orders_for_seller(&f.seller).await.unwrap().len(), 1);
    assert_eq!(f.market.orders.orders_for_buyer(&f.buyer).await.unwrap().len(), 1);
}
