//! Configuration system for the keyway auth bridge.
//!
//! Provides TOML-based configuration with:
//! - Typed sections for the server, sessions, tokens, GitHub and storage
//! - Config file layering (user config dir + project-local overrides)
//! - Secret resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{GITHUB_SECRET_ENV, ResolvedSecret, SecretSource, TOKEN_SECRET_ENV, resolve_secret};
pub use types::*;
