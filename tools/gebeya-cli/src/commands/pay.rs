//! Checkout and payment commands.

use anyhow::Result;
use gebeya_commerce::{OrderId, PaymentMethod, TxRef, UserId};
use gebeya_market::Checkout;
use gebeya_payments::Customer;

use super::{CustomerArgs, PayArgs, PayCommand};
use crate::context::Context;

impl CustomerArgs {
    fn to_customer(&self, user: &UserId) -> Customer {
        Customer {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            ..Customer::new(user.clone())
        }
    }
}

/// Run the pay command.
pub async fn run(args: PayArgs, ctx: &Context) -> Result<()> {
    let market = ctx.market().await?;
    let user = &ctx.actor.user;

    let checkout = match args.command {
        PayCommand::Cod { checkout } => {
            market
                .payments
                .pay_with_cod(user, checkout.to_request(PaymentMethod::Cod)?)
                .await?
        }
        PayCommand::Chapa { checkout, customer } => {
            market
                .payments
                .pay_with_provider(checkout.to_request(PaymentMethod::Chapa)?, &customer.to_customer(user))
                .await?
        }
        PayCommand::Telebirr { checkout, customer } => {
            market
                .payments
                .pay_with_provider(checkout.to_request(PaymentMethod::TeleBirr)?, &customer.to_customer(user))
                .await?
        }
        PayCommand::Retry { order, customer } => {
            market
                .payments
                .retry_payment(&OrderId::new(order), &customer.to_customer(user))
                .await?
        }
        PayCommand::Verify { tx_ref } => {
            let ack = market.payments.verify_payment(&ctx.actor, &TxRef::new(tx_ref)).await?;
            if ctx.output.is_json() {
                ctx.output.json(&ack);
            } else {
                ctx.output.info(&format!("{:?}", ack));
            }
            return Ok(());
        }
    };

    print_checkout(&checkout, ctx);
    Ok(())
}

fn print_checkout(checkout: &Checkout, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "order": checkout.order,
            "redirect_url": checkout.redirect_url,
        }));
        return;
    }
    ctx.output.success(&format!("Payment started for order {}", checkout.order.id));
    if let Some(url) = &checkout.redirect_url {
        ctx.output.kv("pay at", url);
    }
    ctx.output.order(&checkout.order);
}
