//! Escrow commands. Admin only.

use anyhow::Result;
use gebeya_commerce::OrderId;

use super::{EscrowArgs, EscrowCommand};
use crate::context::Context;

/// Run the escrow command.
pub async fn run(args: EscrowArgs, ctx: &Context) -> Result<()> {
    let market = ctx.market().await?;
    if !ctx.actor.is_admin() {
        ctx.output.warn("Escrow operations need --admin");
    }
    let actor = &ctx.actor;

    let order = match args.command {
        EscrowCommand::Hold { order } => {
            let order = market.ledger.hold_funds(actor, &OrderId::new(order)).await?;
            ctx.output.success("Funds held in escrow");
            order
        }
        EscrowCommand::Release { order } => {
            let order = market.ledger.release_funds(actor, &OrderId::new(order)).await?;
            ctx.output.success("Funds released to sellers");
            order
        }
    };

    ctx.output.order(&order);
    Ok(())
}
