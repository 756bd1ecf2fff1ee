//! CLI command handlers.

pub mod start;
pub mod token;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use keyway_auth::TokenConfig;
use keyway_config::KeywayConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load and validate configuration, printing discovery warnings.
    pub fn load_config(&self) -> Result<KeywayConfig> {
        let config = match &self.config_path {
            Some(path) => keyway_config::load_config_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => {
                let loaded = keyway_config::load_config(None)?;
                for warning in &loaded.warnings {
                    eprintln!("warning: {}", warning);
                }
                if self.verbose {
                    for path in loaded.loaded_from() {
                        eprintln!("config: {}", path.display());
                    }
                }
                loaded.config
            }
        };

        config.validate()?;
        Ok(config)
    }
}

/// Token settings with the resolved signing secret.
pub fn token_config(config: &KeywayConfig) -> Result<TokenConfig> {
    let secret = config.token_secret()?;
    tracing::debug!(source = %secret.source, "Resolved token secret");
    Ok(TokenConfig::new(secret.value).with_validity(config.token().validity()))
}
