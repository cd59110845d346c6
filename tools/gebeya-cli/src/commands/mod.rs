//! CLI command implementations.

pub mod cart;
pub mod config;
pub mod escrow;
pub mod order;
pub mod pay;
pub mod seed;
pub mod sign;
pub mod wallet;
pub mod webhook;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use gebeya_commerce::{AddressId, DeliveryMethod, LineStatus, PaymentMethod};
use gebeya_market::{LineRequest, NewOrder};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Overwrite existing config.
        #[arg(short, long)]
        force: bool,
        /// Write JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration.
    Validate,
}

/// Arguments for the seed command.
#[derive(Args)]
pub struct SeedArgs {
    /// Fixture file with `sellers`, `listings` and `addresses`.
    pub fixture: String,
}

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Add a listing to the cart.
    Add {
        /// Listing id.
        listing: String,
        /// Quantity to add.
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Show the cart.
    Show,
}

/// Checkout options shared by `order create` and `pay`.
#[derive(Args, Clone)]
pub struct CheckoutArgs {
    /// Explicit line as `<listing>:<quantity>`. Uses the cart when omitted.
    #[arg(short, long = "line")]
    pub lines: Vec<String>,

    /// Delivery address id.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Deliver instead of pickup.
    #[arg(long)]
    pub delivery: bool,
}

impl CheckoutArgs {
    pub fn to_request(&self, payment_method: PaymentMethod) -> Result<NewOrder> {
        let delivery_method = if self.delivery {
            DeliveryMethod::Delivery
        } else {
            DeliveryMethod::Pickup
        };
        let mut request = NewOrder::from_cart(delivery_method, payment_method)
            .with_lines(self.lines.iter().map(|l| parse_line(l)).collect::<Result<_>>()?);
        if let Some(address) = &self.address {
            request = request.with_address(AddressId::new(address.as_str()));
        }
        Ok(request)
    }
}

fn parse_line(raw: &str) -> Result<LineRequest> {
    let (listing, quantity) = match raw.split_once(':') {
        Some((listing, quantity)) => (listing, quantity),
        None => (raw, "1"),
    };
    let quantity: i64 = quantity
        .parse()
        .map_err(|_| anyhow!("Invalid quantity in line '{}'", raw))?;
    Ok(LineRequest::new(listing, quantity))
}

/// Payment method on the command line.
#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Cod,
    Chapa,
    Telebirr,
}

impl From<MethodArg> for PaymentMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Cod => PaymentMethod::Cod,
            MethodArg::Chapa => PaymentMethod::Chapa,
            MethodArg::Telebirr => PaymentMethod::TeleBirr,
        }
    }
}

/// Arguments for the order command.
#[derive(Args)]
pub struct OrderArgs {
    #[command(subcommand)]
    pub command: OrderCommand,
}

#[derive(Subcommand)]
pub enum OrderCommand {
    /// Create an order without starting a payment.
    Create {
        #[command(flatten)]
        checkout: CheckoutArgs,
        /// Payment method recorded on the order.
        #[arg(short, long, value_enum, default_value = "cod")]
        payment: MethodArg,
    },
    /// Show an order.
    Show {
        /// Order id.
        order: String,
    },
    /// List the acting user's orders.
    List {
        /// List orders containing the user's listings instead.
        #[arg(long)]
        seller: bool,
    },
    /// Upload a payment proof for one line.
    Proof {
        /// Order id.
        order: String,
        /// Listing id of the line.
        product: String,
        /// Receipt file.
        file: String,
        /// Transaction id from the receipt.
        #[arg(short, long)]
        transaction: String,
    },
    /// Set the status of the acting seller's lines.
    Status {
        /// Order id.
        order: String,
        /// processing, shipped, delivered or cancelled.
        status: String,
    },
    /// Confirm receipt of a funds-held order.
    Complete {
        /// Order id.
        order: String,
    },
    /// Cancel an order.
    Cancel {
        /// Order id.
        order: String,
    },
}

pub fn parse_line_status(raw: &str) -> Result<LineStatus> {
    match LineStatus::parse(raw) {
        Some(status) => Ok(status),
        None => bail!("Unknown line status '{}'", raw),
    }
}

/// Arguments for the pay command.
#[derive(Args)]
pub struct PayArgs {
    #[command(subcommand)]
    pub command: PayCommand,
}

/// Buyer contact details sent to gateways.
#[derive(Args, Clone)]
pub struct CustomerArgs {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Subcommand)]
pub enum PayCommand {
    /// Check out with cash on delivery.
    Cod {
        #[command(flatten)]
        checkout: CheckoutArgs,
    },
    /// Check out through Chapa.
    Chapa {
        #[command(flatten)]
        checkout: CheckoutArgs,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Check out through TeleBirr.
    Telebirr {
        #[command(flatten)]
        checkout: CheckoutArgs,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Start a new payment attempt for an unpaid order.
    Retry {
        /// Order id.
        order: String,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    /// Ask the gateway for a payment's state.
    Verify {
        /// Payment reference.
        tx_ref: String,
    },
}

/// Arguments for the webhook command.
#[derive(Args)]
pub struct WebhookArgs {
    /// Gateway that sent the notification.
    #[arg(value_enum)]
    pub provider: GatewayArg,

    /// File with the raw notification body.
    pub payload: String,

    /// Signature header value (Chapa).
    #[arg(short, long)]
    pub signature: Option<String>,
}

/// Gateways that send notifications.
#[derive(Clone, Copy, ValueEnum)]
pub enum GatewayArg {
    Chapa,
    Telebirr,
}

impl From<GatewayArg> for PaymentMethod {
    fn from(gateway: GatewayArg) -> Self {
        match gateway {
            GatewayArg::Chapa => PaymentMethod::Chapa,
            GatewayArg::Telebirr => PaymentMethod::TeleBirr,
        }
    }
}

/// Arguments for the escrow command.
#[derive(Args)]
pub struct EscrowArgs {
    #[command(subcommand)]
    pub command: EscrowCommand,
}

#[derive(Subcommand)]
pub enum EscrowCommand {
    /// Verify payment and hold funds for the sellers.
    Hold {
        /// Order id.
        order: String,
    },
    /// Release a completed order's escrow to the sellers.
    Release {
        /// Order id.
        order: String,
    },
}

/// Arguments for the wallet command.
#[derive(Args)]
pub struct WalletArgs {
    #[command(subcommand)]
    pub command: WalletCommand,
}

#[derive(Subcommand)]
pub enum WalletCommand {
    /// Show a seller wallet.
    Show {
        /// Seller user id. Defaults to the acting user.
        seller: Option<String>,
    },
}

/// Arguments for the sign command.
#[derive(Args)]
pub struct SignArgs {
    #[command(subcommand)]
    pub command: SignCommand,
}

#[derive(Subcommand)]
pub enum SignCommand {
    /// Add `sign` and `sign_type` to a TeleBirr JSON payload.
    Telebirr {
        /// File with the JSON object to sign.
        payload: String,
    },
}
