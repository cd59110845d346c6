//! Shared fixtures for the marketplace scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gebeya_market::prelude::*;
use gebeya_payments::{HttpRequest, HttpResponse, HttpTransport, PaymentError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub fn etb(major: i64) -> Money {
    Money::from_major(major, Currency::ETB).unwrap()
}

/// Gateway stand-in: answers from a queue and records every request.
#[derive(Default)]
pub struct FakeGateway {
    responses: Mutex<VecDeque<Result<HttpResponse, PaymentError>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl FakeGateway {
    pub fn answering(responses: Vec<Result<HttpResponse, PaymentError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    /// Never answers within any sane timeout.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        })
    }

    pub fn json(status: u16, body: serde_json::Value) -> Result<HttpResponse, PaymentError> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for FakeGateway {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PaymentError> {
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PaymentError::Connection("no scripted response".to_string())))
    }
}

/// A marketplace with one approved seller, one buyer and an admin.
pub struct Fixture {
    pub market: Marketplace,
    pub seller: UserId,
    pub buyer: UserId,
    pub admin: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_market(Marketplace::builder(Store::memory()).build()).await
    }

    pub async fn with_market(market: Marketplace) -> Self {
        let fixture = Self {
            market,
            seller: UserId::new("usr_seller"),
            buyer: UserId::new("usr_buyer"),
            admin: Actor::admin("usr_admin"),
        };
        fixture.add_seller(&fixture.seller, SellerStatus::Approved).await;
        fixture
    }

    pub async fn add_seller(&self, user: &UserId, status: SellerStatus) {
        self.market.catalog.register_seller(user, "Merkato Goods").await.unwrap();
        self.market
            .catalog
            .set_seller_status(&self.admin, user, status)
            .await
            .unwrap();
    }

    pub async fn listing(&self, owner: &UserId, title: &str, price: Money, stock: i64) -> Listing {
        let listing = Listing::new(owner.clone(), title, price, stock);
        self.market
            .catalog
            .put_listing(&Actor::member(owner.clone()), &listing)
            .await
            .unwrap();
        listing
    }

    pub async fn address(&self, owner: &UserId) -> Address {
        let address = Address::new(owner.clone(), "Home", "Bole, house 12", "Addis Ababa", "+251911000000");
        self.market.addresses.save(&address).await.unwrap();
        address
    }

    pub fn buyer_actor(&self) -> Actor {
        Actor::member(self.buyer.clone())
    }

    /// A pickup COD order for one listing priced at `price`.
    pub async fn pickup_order(&self, price: Money) -> Order {
        let listing = self.listing(&self.seller, "Handwoven mesob", price, 10).await;
        let request = NewOrder::from_cart(DeliveryMethod::Pickup, PaymentMethod::Cod)
            .with_lines(vec![LineRequest::new(listing.id, 1)]);
        self.market.orders.create_order(&self.buyer, &request).await.unwrap()
    }
}
