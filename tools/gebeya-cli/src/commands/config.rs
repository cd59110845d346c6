//! Configuration management commands.

use anyhow::{bail, Result};
use gebeya_market::config::{ConfigFormat, ProofsSection};
use gebeya_market::MarketConfig;
use gebeya_observability::LogLevel;
use gebeya_payments::{ChapaConfig, TeleBirrConfig};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force, json } => init_config(force, json, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    ctx.output.info("[market]");
    ctx.output.kv("currency", ctx.config.market.currency.code());

    ctx.output.info("[logging]");
    ctx.output.kv("level", ctx.config.logging.level.as_str());
    ctx.output.kv("directive", &ctx.config.logging.directive());

    ctx.output.info("[store]");
    ctx.output.kv("path", &ctx.state_path().display().to_string());

    ctx.output.info("[proofs]");
    ctx.output.kv("dir", &ctx.config.proofs.dir.display().to_string());
    ctx.output.kv("public_base_url", &ctx.config.proofs.public_base_url);

    if let Some(chapa) = &ctx.config.payments.chapa {
        ctx.output.info("[payments.chapa]");
        ctx.output.kv("base_url", &chapa.base_url);
        ctx.output.kv("secret_key", redact(&chapa.secret_key));
        ctx.output.kv("webhook_secret", redact(chapa.webhook_secret.as_deref().unwrap_or_default()));
        ctx.output.kv("callback_url", &chapa.callback_url);
    }
    if let Some(telebirr) = &ctx.config.payments.telebirr {
        ctx.output.info("[payments.telebirr]");
        ctx.output.kv("base_url", &telebirr.base_url);
        ctx.output.kv("app_id", &telebirr.app_id);
        ctx.output.kv("app_key", redact(&telebirr.app_key));
        ctx.output.kv("notify_url", &telebirr.notify_url);
    }

    Ok(())
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(unset)"
    } else {
        "********"
    }
}

fn init_config(force: bool, json: bool, ctx: &Context) -> Result<()> {
    let (name, format) = if json {
        ("gebeya.json", ConfigFormat::Json)
    } else {
        ("gebeya.toml", ConfigFormat::Toml)
    };
    let path = ctx.cwd.join(name);
    if path.exists() && !force {
        bail!("{} already exists. Use --force to overwrite.", path.display());
    }

    std::fs::write(&path, default_config().render(format)?)?;
    ctx.output.success(&format!("Created {}", path.display()));
    ctx.output.info("Put gateway secrets in GEBEYA_CHAPA_SECRET_KEY and GEBEYA_TELEBIRR_APP_KEY");
    Ok(())
}

/// Starter config with both gateways pointed at their sandboxes.
fn default_config() -> MarketConfig {
    let mut config = MarketConfig::default();
    config.logging.level = LogLevel::Warn;
    config.store.path = Some(".gebeya/state.json".into());
    config.proofs = ProofsSection::default();
    config.payments.chapa = Some(ChapaConfig {
        callback_url: "https://localhost/webhooks/chapa".to_string(),
        return_url: "https://localhost/orders".to_string(),
        ..ChapaConfig::default()
    });
    config.payments.telebirr = Some(TeleBirrConfig {
        base_url: "https://developerportal.ethiotelebirr.et:38443/apiaccess/payment/gateway".to_string(),
        notify_url: "https://localhost/webhooks/telebirr".to_string(),
        return_url: "https://localhost/orders".to_string(),
        receive_name: "Gebeya".to_string(),
        timeout_express: "30".to_string(),
        ..TeleBirrConfig::default()
    });
    config
}

fn validate_config(ctx: &Context) -> Result<()> {
    let problems = ctx.config.problems();
    let warnings = ctx.config.warnings();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": problems.is_empty(),
            "problems": problems,
            "warnings": warnings,
        }));
    } else {
        for warning in &warnings {
            ctx.output.warn(warning);
        }
        if problems.is_empty() {
            ctx.output.success("Configuration is valid");
        } else {
            for problem in &problems {
                ctx.output.error(problem);
            }
        }
    }

    if !problems.is_empty() {
        bail!("{} configuration problem(s)", problems.len());
    }
    Ok(())
}
