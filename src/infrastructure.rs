//! Infrastructure layer: configuration, logging, HTML extraction and the
//! proxy HTTP transport.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;

pub use self::config::{AppConfig, BatchConfig, ConfigError, LoggingConfig, ProxyConfig, clamp_concurrency};
pub use http_client::{ProxyFetcher, ProxyRequestBuilder};
pub use logging::init_logging_with_config;
pub use parsing::{
    ExtractionSelectors, ParsingError, ParsingResult, ProductExtractor, extract_product,
    extract_product_name, extract_variants,
};
