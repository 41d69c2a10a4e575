//! HTTP client for page and API fetches
//!
//! Features:
//! - HTTP/2 when negotiated, HTTP/1.1 otherwise
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Desktop Chrome fingerprint headers
//! - Per-call timeouts, no retries
//!
//! The resolver stages never touch reqwest directly: they talk to the
//! [`PageFetcher`] trait so tests can hand them canned pages.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, COOKIE, REFERER};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::ResolverConfig;
use crate::fingerprint::{chrome_profile, BrowserProfile};

/// Status and body of an API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).context("API response is not JSON")
    }
}

/// Outbound HTTP capability used by every resolver stage.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page or script and return its body whatever the status code.
    async fn fetch_page(&self, url: &str, referer: Option<&str>, timeout: Duration)
        -> Result<String>;

    /// GET an API endpoint with query parameters, sent in the given order.
    async fn fetch_api(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<ApiResponse>;
}

/// reqwest-backed [`PageFetcher`]
pub struct AcceleratedClient {
    client: Client,
    profile: BrowserProfile,
}

impl AcceleratedClient {
    /// Create a client with a fresh desktop profile and no cookie.
    pub fn new() -> Result<Self> {
        Self::from_config(&ResolverConfig::default())
    }

    /// Create a client honouring the configured User-Agent and cookie.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut profile = chrome_profile();
        if let Some(ua) = &config.user_agent {
            profile = profile.with_user_agent(ua);
        }

        let mut headers = profile.to_headers();
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie).context("cookie is not valid header text")?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            // Let the server negotiate HTTP/2
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, profile })
    }

    /// Browser profile in use
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for AcceleratedClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_page(
        &self,
        url: &str,
        referer: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        let mut request = self.client.get(url).timeout(timeout);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        debug!(status = %response.status(), version = ?response.version(), "Page received");

        response.text().await.context("failed to read page body")
    }

    #[instrument(skip(self, query), fields(url = %url, params = query.len()))]
    async fn fetch_api(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<ApiResponse> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status().as_u16();
        debug!(status, "API response received");

        let body = response.text().await.context("failed to read API body")?;
        Ok(ApiResponse { status, body })
    }
}
