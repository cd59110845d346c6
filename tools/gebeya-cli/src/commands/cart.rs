//! Cart commands.

use anyhow::Result;
use gebeya_commerce::ListingId;

use super::{CartArgs, CartCommand};
use crate::context::Context;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let market = ctx.market().await?;
    let user = &ctx.actor.user;

    let cart = match args.command {
        CartCommand::Add { listing, quantity } => {
            let cart = market.carts.add_item(user, &ListingId::new(listing.as_str()), quantity).await?;
            ctx.output.success(&format!("Added {} x{} to {}'s cart", listing, quantity, user));
            cart
        }
        CartCommand::Show => market.carts.cart(user).await?,
    };

    if ctx.output.is_json() {
        ctx.output.json(&cart);
        return Ok(());
    }
    ctx.output.header(&format!("Cart of {}", user));
    if cart.is_empty() {
        ctx.output.info("Cart is empty");
    }
    for item in &cart.items {
        ctx.output.list_item(&format!("{} x{}", item.listing, item.quantity));
    }
    Ok(())
}
