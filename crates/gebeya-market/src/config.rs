//! Marketplace configuration.
//!
//! Loaded from TOML or JSON (picked by file extension), then overlaid
//! with `GEBEYA_*` environment variables so secrets never need to live in
//! the file.

use gebeya_commerce::Currency;
use gebeya_observability::{LogConfig, LogFormat, LogLevel};
use gebeya_payments::{ChapaConfig, TeleBirrConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "GEBEYA_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub market: MarketSection,

    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub payments: PaymentsSection,

    #[serde(default)]
    pub proofs: ProofsSection,
}

/// `[market]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSection {
    /// Currency every order is priced in.
    #[serde(default)]
    pub currency: Currency,
}

/// `[store]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// JSON snapshot file. In-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[payments]`. A gateway is enabled when its section is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapa: Option<ChapaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telebirr: Option<TeleBirrConfig>,
}

/// `[proofs]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofsSection {
    #[serde(default = "default_proofs_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_proofs_dir() -> PathBuf {
    PathBuf::from("proofs")
}

fn default_public_base_url() -> String {
    "/proofs".to_string()
}

impl Default for ProofsSection {
    fn default() -> Self {
        Self {
            dir: default_proofs_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// File formats accepted by [`MarketConfig::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl MarketConfig {
    /// Load a config file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, ConfigFormat::from_path(path))?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Overlay `GEBEYA_*` variables read through `lookup`.
    ///
    /// Setting a gateway secret enables that gateway with default settings
    /// if the file did not configure it.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|v| !v.is_empty());

        if let Some(code) = var("CURRENCY") {
            self.market.currency = Currency::from_code(&code).ok_or_else(|| invalid("CURRENCY", &code))?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level.parse::<LogLevel>().map_err(|_| invalid("LOG_LEVEL", &level))?;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "human" => LogFormat::Human,
                _ => return Err(invalid("LOG_FORMAT", &format)),
            };
        }
        if let Some(path) = var("STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(dir) = var("PROOFS_DIR") {
            self.proofs.dir = PathBuf::from(dir);
        }

        if let Some(secret) = var("CHAPA_SECRET_KEY") {
            self.payments.chapa.get_or_insert_with(ChapaConfig::default).secret_key = secret;
        }
        if let Some(secret) = var("CHAPA_WEBHOOK_SECRET") {
            self.payments.chapa.get_or_insert_with(ChapaConfig::default).webhook_secret = Some(secret);
        }
        if let Some(app_id) = var("TELEBIRR_APP_ID") {
            self.payments.telebirr.get_or_insert_with(TeleBirrConfig::default).app_id = app_id;
        }
        if let Some(app_key) = var("TELEBIRR_APP_KEY") {
            self.payments.telebirr.get_or_insert_with(TeleBirrConfig::default).app_key = app_key;
        }
        Ok(())
    }

    /// Everything that would stop the marketplace from running correctly.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(chapa) = &self.payments.chapa {
            if chapa.secret_key.is_empty() {
                problems.push(format!("payments.chapa.secret_key is empty (set {ENV_PREFIX}CHAPA_SECRET_KEY)"));
            }
            if chapa.base_url.is_empty() {
                problems.push("payments.chapa.base_url is empty".to_string());
            }
        }
        if let Some(telebirr) = &self.payments.telebirr {
            if telebirr.app_id.is_empty() {
                problems.push(format!("payments.telebirr.app_id is empty (set {ENV_PREFIX}TELEBIRR_APP_ID)"));
            }
            if telebirr.app_key.is_empty() {
                problems.push(format!("payments.telebirr.app_key is empty (set {ENV_PREFIX}TELEBIRR_APP_KEY)"));
            }
            if telebirr.base_url.is_empty() {
                problems.push("payments.telebirr.base_url is empty".to_string());
            }
        }
        if self.proofs.public_base_url.is_empty() {
            problems.push("proofs.public_base_url is empty".to_string());
        }
        problems
    }

    /// Settings that load but leave the marketplace exposed.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let chapa_unsigned = self
            .payments
            .chapa
            .as_ref()
            .is_some_and(|c| c.webhook_secret.as_deref().map_or(true, str::is_empty));
        if chapa_unsigned {
            warnings.push(format!(
                "payments.chapa.webhook_secret is not set, Chapa webhooks are accepted unsigned (set {ENV_PREFIX}CHAPA_WEBHOOK_SECRET)"
            ));
        }
        warnings
    }

    /// Fail on problems; log warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for warning in self.warnings() {
            warn!("{}", warning);
        }
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

fn invalid(suffix: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: format!("{ENV_PREFIX}{suffix}"),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[market]
currency = "ETB"

[logging]
level = "debug"
format = "json"

[store]
path = "gebeya.json"

[payments.chapa]
callback_url = "https://shop.example/webhooks/chapa"
return_url = "https://shop.example/orders"
"#;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_toml() {
        let config = MarketConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        assert_eq!(config.market.currency, Currency::ETB);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.path, Some(PathBuf::from("gebeya.json")));
        let chapa = config.payments.chapa.as_ref().unwrap();
        assert_eq!(chapa.base_url, "https://api.chapa.co");
        assert!(config.payments.telebirr.is_none());
        assert_eq!(config.proofs, ProofsSection::default());
    }

    #[test]
    fn test_missing_secret_reported() {
        let config = MarketConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GEBEYA_CHAPA_SECRET_KEY"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MarketConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        config
            .apply_env(env(&[
                ("GEBEYA_CHAPA_SECRET_KEY", "CHASECK-test"),
                ("GEBEYA_CURRENCY", "usd"),
                ("GEBEYA_LOG_LEVEL", "warn"),
            ]))
            .unwrap();
        assert_eq!(config.payments.chapa.as_ref().unwrap().secret_key, "CHASECK-test");
        assert_eq!(config.market.currency, Currency::USD);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsigned_chapa_webhooks_warned() {
        let mut config = MarketConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        assert!(config.warnings().iter().any(|w| w.contains("webhook_secret")));

        config
            .apply_env(env(&[
                ("GEBEYA_CHAPA_SECRET_KEY", "CHASECK-test"),
                ("GEBEYA_CHAPA_WEBHOOK_SECRET", "hook-secret"),
            ]))
            .unwrap();
        assert!(config.warnings().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_secret_enables_gateway() {
        let mut config = MarketConfig::default();
        config
            .apply_env(env(&[("GEBEYA_TELEBIRR_APP_KEY", "k")]))
            .unwrap();
        let telebirr = config.payments.telebirr.as_ref().unwrap();
        assert_eq!(telebirr.app_key, "k");
        assert!(config.problems().iter().any(|p| p.contains("app_id")));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = MarketConfig::default();
        let err = config.apply_env(env(&[("GEBEYA_CURRENCY", "EUR")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_json_round_trip_through_render() {
        let config = MarketConfig::parse(SAMPLE, ConfigFormat::Toml).unwrap();
        let json = config.render(ConfigFormat::Json).unwrap();
        assert_eq!(MarketConfig::parse(&json, ConfigFormat::Json).unwrap(), config);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
    }
}
