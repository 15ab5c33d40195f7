//! Client configuration
//!
//! Resolution priority for the backend URL:
//! 1. `--base-url` flag or `$ODINCHAT_BACKEND_URL` (handled by clap)
//! 2. `base_url` in `config.toml`
//! 3. `DEFAULT_BASE_URL`
//!
//! `config.toml` is looked up at `--config <path>`, then
//! `$ODINCHAT_HOME/config.toml`, then the platform config dir.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001/api";

/// Environment variable holding the backend URL
pub const BASE_URL_ENV: &str = "ODINCHAT_BACKEND_URL";

/// Environment variable pointing at the client home directory
pub const HOME_ENV: &str = "ODINCHAT_HOME";

const CONFIG_FILE: &str = "config.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid backend URL '{0}': expected http(s)://host[:port][/path]")]
    InvalidBaseUrl(String),
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the backend API, e.g. `http://localhost:8001/api`
    pub base_url: String,
    /// Timeout for REST calls (not applied to streaming replies)
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Where the TUI writes its log file
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            log_dir: None,
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from a file; `Ok(None)` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Resolve configuration from file and command-line overrides
    ///
    /// An explicit `config_path` must exist; the default location may be absent.
    pub fn resolve(
        config_path: Option<&Path>,
        base_url_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?.ok_or_else(|| ConfigError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            })?,
            None => match default_config_path() {
                Some(path) => {
                    let loaded = Self::load(&path)?;
                    debug!(path = %path.display(), found = loaded.is_some(), "config lookup");
                    loaded.unwrap_or_default()
                }
                None => Self::default(),
            },
        };

        if let Some(url) = base_url_override {
            config.base_url = url.to_string();
        }
        config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Reject base URLs the HTTP backend cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        let scheme_ok = matches!(parsed.scheme(), "http" | "https");
        if !scheme_ok || parsed.host_str().is_none() || parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Log directory: configured, else `<data dir>/odinchat/logs`, else `./logs`
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join("odinchat").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}

/// Default `config.toml` location
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(home).join(CONFIG_FILE));
    }
    dirs::config_dir().map(|dir| dir.join("odinchat").join(CONFIG_FILE))
}
