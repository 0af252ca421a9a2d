//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (the `defaults` module)
//! 2. A TOML/JSON/YAML file (explicit path, or the user config directory)
//! 3. Environment variables, e.g. `SEPHORA_SCRAPER_PROXY__API_KEY`
//!
//! `SCRAPEOPS_API_KEY` is also honoured when no key was configured otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::parsing::ExtractionSelectors;

/// Default values used when nothing else is configured
pub mod defaults {
    /// Rendering proxy endpoint
    pub const PROXY_BASE_URL: &str = "https://proxy.scrapeops.io/v1/";

    /// Per-request timeout; rendering a page through the proxy is slow
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Concurrency used when the caller does not pick one
    pub const DEFAULT_CONCURRENCY: usize = 3;

    /// Upper bound on concurrent fetches, whatever the caller asks for
    pub const MAX_CONCURRENCY: usize = 10;

    /// 0 disables the politeness limiter
    pub const MAX_REQUESTS_PER_SECOND: u32 = 0;

    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

    pub const LOG_LEVEL: &str = "info";

    /// Environment variable prefix for overrides
    pub const ENV_PREFIX: &str = "SEPHORA_SCRAPER";

    /// Fallback environment variable for the proxy API key
    pub const API_KEY_ENV: &str = "SCRAPEOPS_API_KEY";
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Rendering proxy API key is not configured (set {}_PROXY__API_KEY or {})", defaults::ENV_PREFIX, defaults::API_KEY_ENV)]
    MissingApiKey,
}

/// Clamp a requested concurrency into `1..=MAX_CONCURRENCY`
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, defaults::MAX_CONCURRENCY)
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub proxy: ProxyConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
    pub selectors: ExtractionSelectors,
}

/// Rendering proxy settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub base_url: String,
    pub api_key: String,
    /// Optional geo parameter forwarded to the proxy
    pub country: Option<String>,
    pub render_js: bool,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub accept: String,
    pub max_requests_per_second: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::PROXY_BASE_URL.to_string(),
            api_key: String::new(),
            country: None,
            render_js: true,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            accept: defaults::ACCEPT.to_string(),
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("country", &self.country)
            .field("render_js", &self.render_js)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_requests_per_second", &self.max_requests_per_second)
            .finish_non_exhaustive()
    }
}

impl ProxyConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(key)
    }

    /// Country parameter, ignoring blank values
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Batch processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Requested worker count; clamped into 1..=10 before use
    pub concurrency: usize,
    /// Optional overall deadline after which unstarted items are cancelled
    pub deadline_seconds: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::DEFAULT_CONCURRENCY,
            deadline_seconds: None,
        }
    }
}

impl BatchConfig {
    pub fn effective_concurrency(&self) -> usize {
        clamp_concurrency(self.concurrency)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines on stderr instead of plain text
    pub json_format: bool,
    /// Also write a daily-rolling log file
    pub file_output: bool,
    /// Log directory; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            file_output: false,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Default config file location: `<user config dir>/sephora-scraper/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sephora-scraper").join("config.toml"))
    }

    /// Load defaults, then the given file (or the optional default file), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_config_path() {
                    debug!("Looking for optional configuration at {}", default_path.display());
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        if config.proxy.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(defaults::API_KEY_ENV) {
                config.proxy.api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "proxy.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if url::Url::parse(&self.proxy.base_url).is_err() {
            return Err(ConfigError::Validation {
                message: format!("proxy.base_url is not a valid URL: '{}'", self.proxy.base_url),
            });
        }

        if self.proxy.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "proxy.user_agent must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
