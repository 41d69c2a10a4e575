//! In-memory [`PageFetcher`] for stage tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::http_client::{ApiResponse, PageFetcher};

/// Serves canned bodies and records every request. Unknown URLs fail like
/// an unreachable host.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    apis: HashMap<String, ApiResponse>,
    calls: Mutex<Vec<String>>,
    referers: Mutex<Vec<Option<String>>>,
    queries: Mutex<Vec<Vec<(String, String)>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn api(mut self, url: &str, status: u16, body: &str) -> Self {
        self.apis.insert(
            url.to_string(),
            ApiResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Every URL requested, pages and APIs, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Referers sent with page requests, in order.
    pub fn referers(&self) -> Vec<Option<String>> {
        self.referers.lock().unwrap().clone()
    }

    /// Query parameters of every API request, in order.
    pub fn queries(&self) -> Vec<Vec<(String, String)>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(
        &self,
        url: &str,
        referer: Option<&str>,
        _timeout: Duration,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.referers
            .lock()
            .unwrap()
            .push(referer.map(str::to_string));
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }

    async fn fetch_api(
        &self,
        url: &str,
        query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        self.queries.lock().unwrap().push(query.to_vec());
        self.apis
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }
}
