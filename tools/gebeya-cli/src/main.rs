//! Gebeya CLI - operate the marketplace core against a local state file.
//!
//! Commands:
//! - `gebeya config` - Create, show and validate configuration
//! - `gebeya seed` - Load sellers, listings and addresses from a fixture
//! - `gebeya cart` - Manage a buyer's cart
//! - `gebeya order` - Create and drive orders
//! - `gebeya pay` - Check out with COD, Chapa or TeleBirr
//! - `gebeya webhook` - Feed a gateway notification to the reconciler
//! - `gebeya escrow` - Hold and release seller funds
//! - `gebeya wallet` - Show a seller wallet
//! - `gebeya sign` - Sign a TeleBirr payload

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    CartArgs, ConfigArgs, EscrowArgs, OrderArgs, PayArgs, SeedArgs, SignArgs, WalletArgs,
    WebhookArgs,
};

/// Gebeya CLI - marketplace orders, payments and escrow
#[derive(Parser)]
#[command(name = "gebeya")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// User id to act as
    #[arg(long = "as", global = true, default_value = "usr_admin")]
    user: String,

    /// Act with the admin role
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(ConfigArgs),

    /// Load a JSON fixture of sellers, listings and addresses
    Seed(SeedArgs),

    /// Manage the acting user's cart
    Cart(CartArgs),

    /// Create, inspect and update orders
    Order(OrderArgs),

    /// Check out and start a payment
    Pay(PayArgs),

    /// Apply a gateway notification
    Webhook(WebhookArgs),

    /// Move funds in and out of escrow
    Escrow(EscrowArgs),

    /// Inspect seller wallets
    Wallet(WalletArgs),

    /// Sign gateway payloads
    Sign(SignArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let actor = context::actor(&cli.user, cli.admin);
    let ctx = match context::Context::load(cli.config.as_deref(), actor, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::Seed(args) => commands::seed::run(args, &ctx).await,
        Commands::Cart(args) => commands::cart::run(args, &ctx).await,
        Commands::Order(args) => commands::order::run(args, &ctx).await,
        Commands::Pay(args) => commands::pay::run(args, &ctx).await,
        Commands::Webhook(args) => commands::webhook::run(args, &ctx).await,
        Commands::Escrow(args) => commands::escrow::run(args, &ctx).await,
        Commands::Wallet(args) => commands::wallet::run(args, &ctx).await,
        Commands::Sign(args) => commands::sign::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
