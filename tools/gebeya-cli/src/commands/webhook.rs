//! Feed gateway notifications to the reconciler.

use anyhow::Result;
use gebeya_market::WebhookAck;
use gebeya_payments::WebhookRequest;

use super::{GatewayArg, WebhookArgs};
use crate::context::Context;

/// Run the webhook command.
pub async fn run(args: WebhookArgs, ctx: &Context) -> Result<()> {
    let body = ctx.read_input(&args.payload)?;
    let mut request = WebhookRequest::new(body);
    if let Some(signature) = args.signature {
        match args.provider {
            GatewayArg::Chapa => request = request.with_header("x-chapa-signature", signature),
            GatewayArg::Telebirr => ctx.output.warn("TeleBirr notifications are signed in the body; --signature ignored"),
        }
    }

    let market = ctx.market().await?;
    let ack = market.payments.handle_webhook(args.provider.into(), &request).await?;

    if ctx.output.is_json() {
        ctx.output.json(&ack);
        return Ok(());
    }
    match ack {
        WebhookAck::Applied { order_id } => ctx.output.success(&format!("Applied to order {}", order_id)),
        WebhookAck::Duplicate { order_id } => ctx.output.info(&format!("Already applied to order {}", order_id)),
        WebhookAck::Ignored { reason } => ctx.output.warn(&format!("Ignored: {}", reason)),
    }
    Ok(())
}
