//! Best-effort title, description and thumbnail scraping.
//!
//! Nothing here can fail a resolution: a page that cannot be fetched, or a
//! field no pattern accepts, just leaves that field empty.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::http_client::PageFetcher;

use super::PLATFORM_NAME;

/// Descriptions this short are boilerplate.
const MIN_DESCRIPTION_CHARS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

/// Human-facing page fields. Absent fields are not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid metadata pattern"))
        .collect()
}

static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"<title[^>]*>([^<]+)</title>",
        r#""albumName":"([^"]+)""#,
        r#""name":"([^"]+)""#,
        r#"data-player-name="([^"]+)""#,
    ])
});

static DESCRIPTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#""description":"([^"]+)""#,
        r#"<meta name="description" content="([^"]+)""#,
    ])
});

static THUMBNAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#""img":"([^"]+)""#,
        r#"data-player-poster="([^"]+)""#,
        r#""albumImg":"([^"]+)""#,
    ])
});

// "Show - 爱奇艺 ..." / "Show_爱奇艺..."
static BRANDING_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_].*?爱奇艺.*$").expect("valid branding pattern"));

static SEO_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_高清视频在线观看.*$").expect("valid SEO pattern"));

/// Strip branding and SEO suffixes. Rejects empty results and the bare
/// platform name.
pub fn clean_title(raw: &str) -> Option<String> {
    let title = raw.trim();
    let title = BRANDING_SUFFIX.replace(title, "");
    let title = SEO_SUFFIX.replace(title.trim(), "");
    let title = title.trim();

    if title.is_empty() || title == PLATFORM_NAME {
        None
    } else {
        Some(title.to_string())
    }
}

/// Reject boilerplate and cap the length, counting characters.
pub fn clean_description(raw: &str) -> Option<String> {
    let description = raw.trim();
    let chars = description.chars().count();

    if chars <= MIN_DESCRIPTION_CHARS {
        return None;
    }
    if chars > MAX_DESCRIPTION_CHARS {
        let cut: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        return Some(cut + ELLIPSIS);
    }
    Some(description.to_string())
}

/// Only absolute URLs are usable thumbnails.
pub fn clean_thumbnail(raw: &str) -> Option<String> {
    let thumbnail = raw.trim();
    thumbnail.starts_with("http").then(|| thumbnail.to_string())
}

/// First candidate across `patterns` that `clean` accepts.
fn first_accepted(
    html: &str,
    patterns: &[Regex],
    clean: fn(&str) -> Option<String>,
) -> Option<String> {
    patterns.iter().find_map(|re| {
        let raw = re.captures(html)?.get(1)?.as_str();
        clean(raw)
    })
}

/// Scan page source for all three fields independently.
pub fn extract(html: &str) -> PageMetadata {
    PageMetadata {
        title: first_accepted(html, &TITLE_PATTERNS, clean_title),
        description: first_accepted(html, &DESCRIPTION_PATTERNS, clean_description),
        thumbnail_url: first_accepted(html, &THUMBNAIL_PATTERNS, clean_thumbnail),
    }
}

/// Fetches a video page and scrapes [`PageMetadata`] from it.
pub struct MetadataEnricher<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a ResolverConfig,
}

impl<'a> MetadataEnricher<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a ResolverConfig) -> Self {
        Self { fetcher, config }
    }

    /// Never fails; fetch errors yield empty metadata.
    pub async fn enrich(&self, url: &str) -> PageMetadata {
        match self
            .fetcher
            .fetch_page(url, Some(&self.config.page_referer), self.config.page_timeout())
            .await
        {
            Ok(html) => {
                let metadata = extract(&html);
                debug!(
                    title = metadata.title.is_some(),
                    description = metadata.description.is_some(),
                    thumbnail = metadata.thumbnail_url.is_some(),
                    "Page metadata scraped"
                );
                metadata
            }
            Err(e) => {
                debug!("Page fetch for metadata failed: {e:#}");
                PageMetadata::default()
            }
        }
    }
}
