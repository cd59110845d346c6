//! Output formatting for the CLI.

use console::style;
use gebeya_commerce::{Money, Order};

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    /// Print an order, as JSON or as a summary.
    pub fn order(&self, order: &Order) {
        if self.json {
            self.json(order);
            return;
        }
        self.header(&format!("Order {}", order.id));
        self.kv("buyer", order.buyer.as_str());
        self.kv("status", &status_badge(order.status.as_str()));
        self.kv("payment", &format!(
            "{} {}",
            order.payment_method,
            status_badge(order.payment_status.as_str())
        ));
        if let Some(tx_ref) = &order.payment_reference {
            self.kv("tx_ref", tx_ref.as_str());
        }
        self.kv("delivery", order.delivery_method.as_str());
        self.kv("total", &money(&order.total_price));
        if let Some(held) = order.escrow_total().filter(|m| !m.is_zero()) {
            self.kv("in escrow", &money(&held));
        }
        for line in &order.products {
            self.list_item(&format!(
                "{} x{} @ {} [{}] seller {}",
                line.title,
                line.quantity,
                money(&line.price),
                status_badge(line.status.as_str()),
                line.seller_id
            ));
        }
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Status badge for order, line and payment states.
pub fn status_badge(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "paid" | "completed" | "delivered" => style(status).green().to_string(),
        "funds_held" | "shipped" | "processing" => style(status).cyan().to_string(),
        "pending" | "payment_submitted" => style(status).yellow().to_string(),
        "failed" => style(status).red().to_string(),
        "cancelled" => style(status).dim().to_string(),
        _ => status.to_string(),
    }
}

/// Format money with its currency code.
pub fn money(amount: &Money) -> String {
    format!("{} {}", amount.to_decimal_string(), amount.currency.code())
}
