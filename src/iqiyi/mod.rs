//! iQiyi video resolution
//!
//! Turns a public video page URL into the platform's internal ids, page
//! metadata and a signed stream manifest. [`Resolver`] runs the stages in
//! order; each stage is usable on its own as well.
//!
//! | stage | type | can fail the resolution |
//! |-------|------|-------------------------|
//! | ids | [`IdentifierResolver`] | yes |
//! | metadata | [`MetadataEnricher`] | no |
//! | streams | [`StreamRequestBuilder`] | no |

pub mod catalog;
pub mod identity;
pub mod metadata;
pub mod pipeline;
pub mod request;

#[cfg(test)]
mod testing;

pub use catalog::{StreamCatalog, StreamDescriptor};
pub use identity::{IdSource, IdentifierResolver, VideoIdentity};
pub use metadata::{MetadataEnricher, PageMetadata};
pub use pipeline::{
    ResolutionRequest, Resolver, StreamStatus, VideoResolution, VideoResolutionResult,
};
pub use request::{
    parse_manifest, DeviceParams, QueryParams, SignedStreamRequest, SigningContext,
    StreamManifest, StreamRequestBuilder,
};

/// Platform tag in result payloads.
pub const PLATFORM: &str = "iqiyi";

/// Display name; also what a page title degenerates to once stripped.
pub const PLATFORM_NAME: &str = "爱奇艺";

/// Title used when none could be scraped.
pub const DEFAULT_TITLE: &str = "爱奇艺视频";

pub const UPLOADER: &str = "爱奇艺";
