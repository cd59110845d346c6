//! Load fixture data into the state file.

use anyhow::{Context as _, Result};
use gebeya_commerce::{Address, Listing, SellerStatus, UserId};
use gebeya_market::{Actor, MarketError};
use serde::Deserialize;

use super::SeedArgs;
use crate::context::Context;

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    sellers: Vec<SellerFixture>,
    #[serde(default)]
    listings: Vec<Listing>,
    #[serde(default)]
    addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
struct SellerFixture {
    user: UserId,
    shop_name: String,
    #[serde(default)]
    status: SellerStatus,
}

/// Run the seed command.
pub async fn run(args: SeedArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.read_input(&args.fixture)?;
    let fixture: Fixture = serde_json::from_str(&raw).with_context(|| format!("Invalid fixture: {}", args.fixture))?;
    let market = ctx.market().await?;
    let admin = Actor::admin(ctx.actor.user.clone());

    for seller in &fixture.sellers {
        match market.catalog.register_seller(&seller.user, &seller.shop_name).await {
            Ok(_) => {}
            // Re-seeding keeps existing profiles and only updates the status.
            Err(MarketError::Validation(msg)) => ctx.output.debug(&msg),
            Err(e) => return Err(e.into()),
        }
        market
            .catalog
            .set_seller_status(&admin, &seller.user, seller.status)
            .await?;
    }
    for listing in &fixture.listings {
        market.catalog.put_listing(&admin, listing).await?;
    }
    for address in &fixture.addresses {
        market.addresses.save(address).await?;
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "sellers": fixture.sellers.len(),
            "listings": fixture.listings.len(),
            "addresses": fixture.addresses.len(),
        }));
    } else {
        ctx.output.success(&format!(
            "Seeded {} seller(s), {} listing(s), {} address(es)",
            fixture.sellers.len(),
            fixture.listings.len(),
            fixture.addresses.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_parses_with_defaults() {
        let fixture: Fixture = serde_json::from_str(
            r#"{
                "sellers": [{ "user": "usr_seller", "shop_name": "Merkato", "status": "approved" }],
                "listings": [{
                    "id": "lst_coffee",
                    "owner": "usr_seller",
                    "title": "Coffee",
                    "price": { "amount_minor": 1000, "currency": "ETB" },
                    "stock": 5,
                    "category": "food"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(fixture.sellers[0].status, SellerStatus::Approved);
        assert_eq!(fixture.listings[0].stock, 5);
        assert!(fixture.addresses.is_empty());
    }
}
