//! tvid/vid recovery
//!
//! The platform has no public lookup for the two ids its stream API needs,
//! so they are scraped. Three strategies run in order and the first that
//! yields both ids wins:
//!
//! 1. the player accelerator script, requested with the video page as referer
//! 2. the video page itself, scanned with several pattern pairs
//! 3. the URL, reusing one id for both slots

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::http_client::PageFetcher;

/// The two cooperating ids the stream API requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoIdentity {
    #[serde(rename = "tvid")]
    pub primary_id: String,
    #[serde(rename = "vid")]
    pub secondary_id: String,
}

impl VideoIdentity {
    /// Both ids must be non-empty.
    pub fn new(primary_id: impl Into<String>, secondary_id: impl Into<String>) -> Option<Self> {
        let primary_id = primary_id.into();
        let secondary_id = secondary_id.into();
        if primary_id.is_empty() || secondary_id.is_empty() {
            return None;
        }
        Some(Self {
            primary_id,
            secondary_id,
        })
    }
}

/// Which strategy produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    Accelerator,
    PageSource,
    /// Same token in both slots.
    Url,
}

impl IdSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerator => "accelerator",
            Self::PageSource => "page_source",
            Self::Url => "url",
        }
    }
}

/// A primary/secondary pattern pair. Both must match the same text.
struct PatternPair {
    primary: Regex,
    secondary: Regex,
}

impl PatternPair {
    fn new(primary: &str, secondary: &str) -> Self {
        Self {
            primary: Regex::new(primary).expect("valid tvid pattern"),
            secondary: Regex::new(secondary).expect("valid vid pattern"),
        }
    }

    fn capture(&self, text: &str) -> Option<VideoIdentity> {
        let primary = self.primary.captures(text)?.get(1)?.as_str();
        let secondary = self.secondary.captures(text)?.get(1)?.as_str();
        VideoIdentity::new(primary, secondary)
    }
}

static ACCELERATOR_PATTERNS: LazyLock<PatternPair> = LazyLock::new(|| {
    PatternPair::new(r#""tvid":([A-Za-z0-9]+)"#, r#""vid":"([A-Za-z0-9]+)""#)
});

static PAGE_PATTERNS: LazyLock<Vec<PatternPair>> = LazyLock::new(|| {
    vec![
        // Quoted JSON fields: "tvId":"123","vid":"abc"
        PatternPair::new(r#""tvId":"([^"]+)""#, r#""vid":"([^"]+)""#),
        // Loose assignments: tvid=123, vid: 'abc'
        PatternPair::new(
            r#"tvid["']?\s*[:=]\s*["']?([A-Za-z0-9]+)"#,
            r#"vid["']?\s*[:=]\s*["']?([A-Za-z0-9]+)"#,
        ),
        // Player data attributes
        PatternPair::new(
            r#"data-player-tvid="([^"]+)""#,
            r#"data-player-videoid="([^"]+)""#,
        ),
        // Numeric album/tv ids
        PatternPair::new(r#""albumId":([0-9]+)"#, r#""tvId":([0-9]+)"#),
    ]
});

static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"v_([a-zA-Z0-9]+)\.html", r"vid=([a-zA-Z0-9]+)"]
        .iter()
        .map(|p| Regex::new(p).expect("valid URL id pattern"))
        .collect()
});

/// Scan an accelerator response.
pub fn match_accelerator(body: &str) -> Option<VideoIdentity> {
    ACCELERATOR_PATTERNS.capture(body)
}

/// Scan page source; the first pair that yields both ids wins.
pub fn match_page(html: &str) -> Option<VideoIdentity> {
    PAGE_PATTERNS.iter().find_map(|pair| pair.capture(html))
}

/// Degraded fallback: one token from the URL fills both slots.
pub fn match_url(url: &str) -> Option<VideoIdentity> {
    let token = URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(url)?.get(1).map(|m| m.as_str().to_string()))?;
    VideoIdentity::new(token.clone(), token)
}

/// Runs the strategy cascade against one URL.
pub struct IdentifierResolver<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a ResolverConfig,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a ResolverConfig) -> Self {
        Self { fetcher, config }
    }

    /// Resolve both ids or fail with [`ResolveError::IdExtractionFailed`].
    pub async fn resolve(&self, url: &str) -> Result<VideoIdentity> {
        self.resolve_with_source(url).await.map(|(identity, _)| identity)
    }

    /// Like [`resolve`](Self::resolve), also reporting the winning strategy.
    pub async fn resolve_with_source(&self, url: &str) -> Result<(VideoIdentity, IdSource)> {
        if !self.config.skip_accelerator {
            if let Some(identity) = self.probe_accelerator(url).await {
                return Ok(found(identity, IdSource::Accelerator));
            }
        }

        if let Some(identity) = self.scan_page(url).await {
            return Ok(found(identity, IdSource::PageSource));
        }

        if let Some(identity) = match_url(url) {
            return Ok(found(identity, IdSource::Url));
        }

        Err(ResolveError::IdExtractionFailed)
    }

    async fn probe_accelerator(&self, url: &str) -> Option<VideoIdentity> {
        let referer = url.split('?').next().unwrap_or(url);
        match self
            .fetcher
            .fetch_page(
                &self.config.accelerator_url,
                Some(referer),
                self.config.accelerator_timeout(),
            )
            .await
        {
            Ok(body) => {
                let identity = match_accelerator(&body);
                if identity.is_none() {
                    debug!("Accelerator response had no tvid/vid");
                }
                identity
            }
            Err(e) => {
                debug!("Accelerator probe failed: {e:#}");
                None
            }
        }
    }

    async fn scan_page(&self, url: &str) -> Option<VideoIdentity> {
        match self
            .fetcher
            .fetch_page(url, Some(&self.config.page_referer), self.config.page_timeout())
            .await
        {
            Ok(html) => {
                let identity = match_page(&html);
                if identity.is_none() {
                    debug!("No id pattern matched the page source");
                }
                identity
            }
            Err(e) => {
                debug!("Page fetch for ids failed: {e:#}");
                None
            }
        }
    }
}

fn found(identity: VideoIdentity, source: IdSource) -> (VideoIdentity, IdSource) {
    info!(
        tvid = %identity.primary_id,
        vid = %identity.secondary_id,
        source = source.as_str(),
        "Resolved video ids"
    );
    (identity, source)
}
