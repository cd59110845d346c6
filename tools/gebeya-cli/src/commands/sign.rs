//! Payload signing.

use anyhow::{anyhow, bail, Result};
use gebeya_payments::signing::sign_fields;
use gebeya_payments::SIGN_TYPE;

use super::{SignArgs, SignCommand};
use crate::context::Context;

/// Run the sign command.
pub async fn run(args: SignArgs, ctx: &Context) -> Result<()> {
    let SignCommand::Telebirr { payload } = args.command;

    let app_key = ctx
        .config
        .payments
        .telebirr
        .as_ref()
        .map(|t| t.app_key.as_str())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| anyhow!("payments.telebirr.app_key is not configured"))?;

    let raw = ctx.read_input(&payload)?;
    let serde_json::Value::Object(mut fields) = serde_json::from_str(&raw)? else {
        bail!("{} must contain a JSON object", payload);
    };
    let sign = sign_fields(app_key, &fields)?;
    fields.insert("sign".to_string(), sign.into());
    fields.insert("sign_type".to_string(), SIGN_TYPE.into());

    ctx.output.json(&fields);
    Ok(())
}
