//! HTTP transport through the rendering proxy
//!
//! Every page is requested as `GET <proxy>?api_key=..&url=<target>&render_js=true`,
//! optionally with a `country` geo parameter. The proxy URL carries the API
//! key, so only the target URL is ever logged or put into an error.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, Url,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::{debug, info};

use crate::crawling::fetcher::{FetchError, PageFetcher};
use crate::infrastructure::config::ProxyConfig;

/// Longest slice of an error response body kept in [`FetchError::Status`]
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Builds proxy request URLs for target pages
#[derive(Clone)]
pub struct ProxyRequestBuilder {
    base_url: Url,
    api_key: String,
    country: Option<String>,
    render_js: bool,
}

impl std::fmt::Debug for ProxyRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRequestBuilder")
            .field("base_url", &self.base_url.as_str())
            .field("country", &self.country)
            .field("render_js", &self.render_js)
            .finish_non_exhaustive()
    }
}

impl ProxyRequestBuilder {
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid proxy base URL: {}", config.base_url))?;

        Ok(Self {
            base_url,
            api_key,
            country: config.country().map(str::to_string),
            render_js: config.render_js,
        })
    }

    /// Proxy URL for `target_url`, which must be an absolute URL
    pub fn build(&self, target_url: &str) -> Result<Url, FetchError> {
        Url::parse(target_url).map_err(|e| FetchError::InvalidUrl {
            url: target_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            query.append_pair("url", target_url);
            if self.render_js {
                query.append_pair("render_js", "true");
            }
            if let Some(country) = &self.country {
                query.append_pair("country", country);
            }
        }
        Ok(url)
    }
}

/// [`PageFetcher`] backed by a shared `reqwest` client and the rendering proxy
pub struct ProxyFetcher {
    client: Client,
    requests: ProxyRequestBuilder,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    timeout_seconds: u64,
}

impl ProxyFetcher {
    /// Create a fetcher; fails when the API key is missing or a header is invalid
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let requests = ProxyRequestBuilder::from_config(config)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept).context("Invalid accept header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        // 0 turns the limiter off
        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        info!(
            "Proxy fetcher ready (timeout {}s, rate limit {})",
            config.timeout_seconds,
            rate_limiter
                .as_ref()
                .map_or_else(|| "off".to_string(), |_| format!("{}/s", config.max_requests_per_second))
        );

        Ok(Self {
            client,
            requests,
            rate_limiter,
            timeout_seconds: config.timeout_seconds,
        })
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            // The request URL embeds the API key
            FetchError::Network(strip_url(error))
        }
    }
}

fn strip_url(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    if let Some(url) = error.url() {
        text = text.replace(url.as_str(), "<proxy>");
    }
    text
}

fn truncate_body(body: &str) -> String {
    body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[async_trait]
impl PageFetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let proxy_url = self.requests.build(url)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        info!("Fetching via proxy: {}", url);

        let response = self
            .client
            .get(proxy_url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Proxy returned {} for {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport_error(&e)
            } else {
                FetchError::Body(strip_url(&e))
            }
        })?;

        debug!("Fetched {} ({} chars)", url, text.len());
        Ok(text)
    }
}
