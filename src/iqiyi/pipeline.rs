//! Resolution pipeline
//!
//! ```text
//! validate ─▶ ids ─▶ metadata (best effort) ─▶ streams (best effort, needs signer) ─▶ result
//!   │          │
//!   ▼          ▼
//! invalid_url  id_extraction_failed
//! ```
//!
//! Only the first two stages can fail a resolution. Each later stage returns
//! its own value and the orchestrator assembles them, so a failed optional
//! stage just leaves its field empty.

use serde::{Serialize, Serializer};
use tracing::{info, instrument, warn};

use crate::config::ResolverConfig;
use crate::error::{ErrorKind, ResolveError, Result};
use crate::http_client::{AcceleratedClient, PageFetcher};
use crate::signing::SigningCapability;

use super::catalog::StreamCatalog;
use super::identity::{IdentifierResolver, VideoIdentity};
use super::metadata::{MetadataEnricher, PageMetadata};
use super::request::StreamRequestBuilder;
use super::{DEFAULT_TITLE, PLATFORM, UPLOADER};

/// A URL that passed domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    url: String,
}

impl ResolutionRequest {
    pub fn new(url: &str, config: &ResolverConfig) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() || !config.accepts(url) {
            return Err(ResolveError::InvalidUrl(url.to_string()));
        }
        Ok(Self {
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// How far stream resolution got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Resolved,
    /// Request attempted, nothing usable came back.
    Unavailable,
    /// No signing engine.
    Skipped,
}

/// Everything recovered for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResolution {
    pub url: String,
    pub identity: VideoIdentity,
    pub metadata: PageMetadata,
    pub streams: StreamCatalog,
    pub duration_seconds: i64,
    pub stream_status: StreamStatus,
}

impl VideoResolution {
    /// Succeeded without streams.
    pub fn is_degraded(&self) -> bool {
        self.stream_status != StreamStatus::Resolved
    }
}

/// Terminal payload of a resolution. Always well formed.
#[derive(Debug)]
pub enum VideoResolutionResult {
    Success(Box<VideoResolution>),
    Failure(ResolveError),
}

impl VideoResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e.kind()),
        }
    }

    pub fn resolution(&self) -> Option<&VideoResolution> {
        match self {
            Self::Success(r) => Some(r),
            Self::Failure(_) => None,
        }
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| serialization_failure(&e.to_string()))
    }
}

/// Failure payload used when the result itself cannot be serialized.
fn serialization_failure(message: &str) -> String {
    serde_json::json!({
        "success": false,
        "error": message,
        "error_type": ErrorKind::ParsingFailed,
    })
    .to_string()
}

impl From<ResolveError> for VideoResolutionResult {
    fn from(err: ResolveError) -> Self {
        Self::Failure(err)
    }
}

#[derive(Serialize)]
struct SuccessPayload<'a> {
    success: bool,
    platform: &'static str,
    tvid: &'a str,
    vid: &'a str,
    title: &'a str,
    thumbnail: &'a str,
    duration: i64,
    uploader: &'static str,
    description: &'a str,
    url: &'a str,
    streams: &'a StreamCatalog,
    stream_status: StreamStatus,
}

#[derive(Serialize)]
struct FailurePayload<'a> {
    success: bool,
    error: String,
    error_type: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl Serialize for VideoResolutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success(r) => SuccessPayload {
                success: true,
                platform: PLATFORM,
                tvid: &r.identity.primary_id,
                vid: &r.identity.secondary_id,
                title: r.metadata.title.as_deref().unwrap_or(DEFAULT_TITLE),
                thumbnail: r.metadata.thumbnail_url.as_deref().unwrap_or_default(),
                duration: r.duration_seconds,
                uploader: UPLOADER,
                description: r.metadata.description.as_deref().unwrap_or_default(),
                url: &r.url,
                streams: &r.streams,
                stream_status: r.stream_status,
            }
            .serialize(serializer),
            Self::Failure(e) => FailurePayload {
                success: false,
                error: e.to_string(),
                error_type: e.kind(),
                details: e.details(),
            }
            .serialize(serializer),
        }
    }
}

/// Runs the full pipeline. Cheap to share; holds no per-request state.
pub struct Resolver<F = AcceleratedClient> {
    fetcher: F,
    config: ResolverConfig,
    signing: SigningCapability,
}

impl Resolver<AcceleratedClient> {
    /// Build the HTTP client and load the signing script named by `config`.
    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        let fetcher = AcceleratedClient::from_config(&config)
            .map_err(|e| ResolveError::Config(format!("{e:#}")))?;
        let signing = SigningCapability::load_script(&config.signer_script_path());
        Ok(Self::new(fetcher, config, signing))
    }
}

impl<F: PageFetcher> Resolver<F> {
    pub fn new(fetcher: F, config: ResolverConfig, signing: SigningCapability) -> Self {
        Self {
            fetcher,
            config,
            signing,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn signing(&self) -> &SigningCapability {
        &self.signing
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn identifiers(&self) -> IdentifierResolver<'_> {
        IdentifierResolver::new(&self.fetcher, &self.config)
    }

    pub fn enricher(&self) -> MetadataEnricher<'_> {
        MetadataEnricher::new(&self.fetcher, &self.config)
    }

    /// Resolve one URL. Never panics and never returns a partial payload.
    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> VideoResolutionResult {
        match self.run(url).await {
            Ok(resolution) => {
                info!(
                    streams = resolution.streams.available.len(),
                    status = ?resolution.stream_status,
                    "Resolution complete"
                );
                VideoResolutionResult::Success(Box::new(resolution))
            }
            Err(e) => {
                warn!(error_type = %e.kind(), "Resolution failed: {e}");
                VideoResolutionResult::Failure(e)
            }
        }
    }

    async fn run(&self, url: &str) -> Result<VideoResolution> {
        let request = ResolutionRequest::new(url, &self.config)?;
        info!(signer = self.signing.is_available(), "Resolving");

        let identity = self.identifiers().resolve(request.url()).await?;
        let metadata = self.enricher().enrich(request.url()).await;
        let (streams, duration_seconds, stream_status) = self.resolve_streams(&identity).await;

        Ok(VideoResolution {
            url: request.url,
            identity,
            metadata,
            streams,
            duration_seconds,
            stream_status,
        })
    }

    async fn resolve_streams(&self, identity: &VideoIdentity) -> (StreamCatalog, i64, StreamStatus) {
        let Some(signer) = self.signing.engine() else {
            info!("No signing engine, skipping streams");
            return (StreamCatalog::default(), 0, StreamStatus::Skipped);
        };

        let builder = StreamRequestBuilder::new(signer, &self.config.dash_path);
        match builder
            .build_and_fetch(identity, &self.fetcher, &self.config)
            .await
        {
            Ok(Some(manifest)) => (
                manifest.catalog,
                manifest.duration_seconds,
                StreamStatus::Resolved,
            ),
            Ok(None) => (StreamCatalog::default(), 0, StreamStatus::Unavailable),
            Err(e) => {
                warn!("Stream resolution failed: {e:#}");
                (StreamCatalog::default(), 0, StreamStatus::Unavailable)
            }
        }
    }
}
