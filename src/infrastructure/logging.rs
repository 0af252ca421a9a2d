//! Logging system configuration and initialization
//!
//! - Console output on stderr (stdout carries the JSON reports)
//! - Optional daily-rolling log file
//! - Plain or JSON formatting
//! - `RUST_LOG` overrides the configured level

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::infrastructure::config::LoggingConfig;

/// Base name of the rolling log file
pub const LOG_FILE_NAME: &str = "sephora-scraper.log";

// Keeps the non-blocking file writer alive for the life of the process
static LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Build the env filter: `RUST_LOG` wins, otherwise the configured level with
/// HTTP client internals held back unless tracing.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        for directive in ["reqwest=info", "hyper=warn", "hyper_util=warn", "h2=warn", "html5ever=warn", "selectors=warn"] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);

    let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);

    let result = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let (file_writer, file_guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_NAME));
        LOG_GUARD
            .set(file_guard)
            .map_err(|_| anyhow!("Logging already initialized"))?;

        if config.json_format {
            let file_layer = fmt::Layer::new()
                .json()
                .with_writer(file_writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false);
            let console_layer = fmt::Layer::new()
                .json()
                .with_writer(std::io::stderr)
                .with_timer(ChronoUtc::rfc_3339());

            registry.with(file_layer).with(console_layer).try_init()
        } else {
            // File layer without ANSI color codes
            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false);
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(false);

            registry.with(file_layer).with(console_layer).try_init()
        }
    } else if config.json_format {
        let console_layer = fmt::Layer::new()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::rfc_3339());

        registry.with(console_layer).try_init()
    } else {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(false);

        registry.with(console_layer).try_init()
    };

    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    if config.file_output {
        info!("Log file: {}", log_dir.join(LOG_FILE_NAME).display());
    }

    Ok(())
}
