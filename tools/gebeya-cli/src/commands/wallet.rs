//! Wallet commands.

use anyhow::Result;
use gebeya_commerce::UserId;

use super::{WalletArgs, WalletCommand};
use crate::context::Context;
use crate::output::money;

/// Run the wallet command.
pub async fn run(args: WalletArgs, ctx: &Context) -> Result<()> {
    let market = ctx.market().await?;
    let WalletCommand::Show { seller } = args.command;
    let seller = seller.map(UserId::from).unwrap_or_else(|| ctx.actor.user.clone());

    let wallet = market.ledger.wallet(&seller).await?;
    if ctx.output.is_json() {
        ctx.output.json(&wallet);
        return Ok(());
    }
    ctx.output.header(&format!("Wallet of {}", seller));
    ctx.output.kv("balance", &money(&wallet.balance()));
    ctx.output.kv("escrow_held", &money(&wallet.escrow_held()));
    Ok(())
}
