//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use gebeya_market::{Actor, MarketConfig, Marketplace};
use gebeya_observability::{init_logging, LogLevel};

use crate::output::Output;

/// Config file names searched from the working directory upwards.
pub const CONFIG_NAMES: [&str; 3] = ["gebeya.toml", ".gebeya.toml", "gebeya.json"];

/// State file used when the config does not name one.
const DEFAULT_STATE_FILE: &str = ".gebeya/state.json";

/// Execution context for CLI commands.
pub struct Context {
    /// Marketplace configuration.
    pub config: MarketConfig,
    /// Where the configuration was read from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// Who the command acts as.
    pub actor: Actor,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, actor: Actor, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (mut config, config_path) = match config_path {
            Some(path) => {
                let config = MarketConfig::load(path).with_context(|| format!("Failed to load config: {}", path))?;
                (config, Some(PathBuf::from(path)))
            }
            None => match Self::find_config(&cwd) {
                Some(path) => (MarketConfig::load(&path)?, Some(path)),
                None => {
                    let mut config = MarketConfig::default();
                    config.logging.level = LogLevel::Warn;
                    config.apply_env(|name| std::env::var(name).ok())?;
                    (config, None)
                }
            },
        };

        if output.is_verbose() {
            config.logging.level = LogLevel::Debug;
        }
        // A second init only happens in tests; keep going without logs.
        if let Err(e) = init_logging(&config.logging) {
            output.debug(&format!("Logging not initialized: {}", e));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            actor,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let candidate = current.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// The state file all commands read and write.
    pub fn state_path(&self) -> PathBuf {
        match &self.config.store.path {
            Some(path) => self.resolve_path(path),
            None => self.cwd.join(DEFAULT_STATE_FILE),
        }
    }

    /// Wire the marketplace over the state file.
    pub async fn market(&self) -> Result<Marketplace> {
        let mut config = self.config.clone();
        let state = self.state_path();
        if let Some(parent) = state.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.output.debug(&format!("State file: {}", state.display()));
        config.store.path = Some(state);
        config.proofs.dir = self.resolve_path(&config.proofs.dir);

        Marketplace::from_config(&config)
            .await
            .context("Failed to open marketplace")
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Read a file named on the command line.
    pub fn read_input(&self, path: &str) -> Result<String> {
        let path = self.resolve_path(Path::new(path));
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Build the acting user from the global flags.
pub fn actor(user: &str, admin: bool) -> Actor {
    if admin {
        Actor::admin(user)
    } else {
        Actor::member(user)
    }
}
