//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tradecore/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tradecore/` (~/.config/tradecore/)
//! - Data: `$XDG_DATA_HOME/tradecore/` (~/.local/share/tradecore/)
//! - State/Logs: `$XDG_STATE_HOME/tradecore/` (~/.local/state/tradecore/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tradecore";

/// Env var consulted when `analysis.api_key` is not set
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analysis API configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Market ticker configuration
    #[serde(default)]
    pub ticker: TickerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analysis (search LLM) API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Base URL of the chat-completions API or of a key-injecting proxy
    #[serde(default = "default_analysis_endpoint")]
    pub endpoint: String,

    /// API key (can also use the `PERPLEXITY_API_KEY` env var)
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,

    /// Domains the search engine is restricted to
    #[serde(default = "default_search_domains")]
    pub search_domains: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analysis_endpoint(),
            api_key: None,
            timeout_secs: default_analysis_timeout(),
            search_domains: default_search_domains(),
        }
    }
}

impl AnalysisConfig {
    /// Resolve the API key from config, then from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether requests go straight to the hosted API (and so need a key).
    pub fn targets_hosted_api(&self) -> bool {
        self.endpoint.trim_end_matches('/') == default_analysis_endpoint()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("analysis.endpoint must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("analysis.timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn default_analysis_endpoint() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_analysis_timeout() -> u64 {
    60
}

fn default_search_domains() -> Vec<String> {
    ["tradingview.com", "bloomberg.com", "reuters.com", "coindesk.com"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

/// Market ticker configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TickerConfig {
    /// Base URL of the CoinCap-compatible assets API
    #[serde(default = "default_ticker_endpoint")]
    pub endpoint: String,

    /// Symbol shown by default
    #[serde(default = "default_ticker_symbol")]
    pub symbol: String,

    /// Seconds between polls in watch mode
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_ticker_timeout")]
    pub timeout_secs: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ticker_endpoint(),
            symbol: default_ticker_symbol(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_ticker_timeout(),
        }
    }
}

fn default_ticker_endpoint() -> String {
    "https://api.coincap.io/v2".to_string()
}

fn default_ticker_symbol() -> String {
    "XAU".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_ticker_timeout() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily log files to keep (0 keeps all)
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    7
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analysis.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tradecore/config.toml` (~/.config/tradecore/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path (for the SQLite store)
    ///
    /// `$XDG_DATA_HOME/tradecore/` (~/.local/share/tradecore/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tradecore/` (~/.local/state/tradecore/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/tradecore/data.db` (~/.local/share/tradecore/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

}
