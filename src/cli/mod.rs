//! CLI module
//!
//! Provides:
//! - Argument parsing (clap) for the TUI and one-shot modes
//! - Configuration loading from flags, environment and config.toml
//! - Mode dispatch (sessions, ask, delete)

pub mod args;
pub mod dispatch;

// Re-exports
pub use args::{Args, Mode};
pub use dispatch::{exit_code_for, run_cli_mode, ExitCode};

use crate::api::ApiError;
use crate::config::{Config, ConfigError};
use crate::state::SendError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Cannot send: {0}")]
    Send(#[from] SendError),

    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Resolve configuration for the parsed arguments
pub fn load_config(args: &Args) -> Result<Config> {
    Ok(Config::resolve(
        args.config.as_deref(),
        args.base_url.as_deref(),
    )?)
}
