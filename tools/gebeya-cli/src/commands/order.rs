//! Order commands.

use anyhow::{Context as _, Result};
use gebeya_commerce::{ListingId, OrderId};
use gebeya_market::ProofUpload;
use std::path::Path;

use super::{parse_line_status, OrderArgs, OrderCommand};
use crate::context::Context;
use crate::output::{money, status_badge};

/// Run the order command.
pub async fn run(args: OrderArgs, ctx: &Context) -> Result<()> {
    let market = ctx.market().await?;
    let actor = &ctx.actor;

    let order = match args.command {
        OrderCommand::Create { checkout, payment } => {
            let request = checkout.to_request(payment.into())?;
            let order = market.orders.create_order(&actor.user, &request).await?;
            ctx.output.success(&format!("Created order {}", order.id));
            order
        }
        OrderCommand::Show { order } => market.orders.get_order(actor, &OrderId::new(order)).await?,
        OrderCommand::List { seller } => {
            let orders = if seller {
                market.orders.orders_for_seller(&actor.user).await?
            } else {
                market.orders.orders_for_buyer(&actor.user).await?
            };
            if ctx.output.is_json() {
                ctx.output.json(&orders);
                return Ok(());
            }
            ctx.output.header(&format!("{} order(s)", orders.len()));
            for order in &orders {
                let status = status_badge(order.status.as_str());
                let payment = status_badge(order.payment_status.as_str());
                let total = money(&order.total_price);
                ctx.output.table_row(
                    &[order.id.as_str(), status.as_str(), payment.as_str(), total.as_str()],
                    &[38, 12, 9, 14],
                );
            }
            return Ok(());
        }
        OrderCommand::Proof {
            order,
            product,
            file,
            transaction,
        } => {
            let path = ctx.resolve_path(Path::new(&file));
            let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let upload = ProofUpload {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone()),
                content_type: content_type(&path).to_string(),
                bytes,
            };
            let order = market
                .orders
                .upload_payment_proof(
                    &actor.user,
                    &OrderId::new(order),
                    &ListingId::new(product),
                    upload,
                    &transaction,
                )
                .await?;
            ctx.output.success("Payment proof submitted");
            order
        }
        OrderCommand::Status { order, status } => {
            let status = parse_line_status(&status)?;
            let order = market
                .orders
                .change_order_status(&OrderId::new(order), &actor.user, status)
                .await?;
            ctx.output.success(&format!("Lines of {} set to {}", actor.user, status));
            order
        }
        OrderCommand::Complete { order } => {
            let order = market.orders.complete_order(actor, &OrderId::new(order)).await?;
            ctx.output.success("Order completed");
            order
        }
        OrderCommand::Cancel { order } => {
            let order = market.orders.cancel_order(actor, &OrderId::new(order)).await?;
            ctx.output.success("Order cancelled");
            order
        }
    };

    ctx.output.order(&order);
    Ok(())
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
