//! `qiyi` - iQiyi video resolver
//!
//! Resolves a public iQiyi page URL into the platform's internal video ids,
//! best-effort page metadata and, when a signing script is available, the
//! signed stream manifest.
//!
//! # Features
//!
//! - **ID recovery**: accelerator probe, page-source patterns, URL fallback
//! - **Metadata**: title, description and thumbnail scraped from the page
//! - **Signed requests**: ordered `dash` query with `authKey` and `vf`
//! - **Pluggable signing**: any [`SigningEngine`]; `QuickJS` runs the
//!   platform script by default
//!
//! # Example
//!
//! ```rust,no_run
//! use qiyi::{Resolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = Resolver::from_config(ResolverConfig::load()?)?;
//!     let result = resolver.resolve("https://www.iqiyi.com/v_19rrok4nt0.html").await;
//!     println!("{}", result.to_json_pretty());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod iqiyi;
pub mod js_engine;
pub mod signing;

pub use config::ResolverConfig;
pub use error::{ErrorKind, ResolveError};
pub use fingerprint::{chrome_profile, BrowserProfile};
pub use http_client::{AcceleratedClient, ApiResponse, PageFetcher};
pub use iqiyi::{
    PageMetadata, Resolver, StreamCatalog, StreamDescriptor, StreamStatus, VideoIdentity,
    VideoResolution, VideoResolutionResult,
};
pub use js_engine::{JsEngine, ScriptSigner};
pub use signing::{SigningCapability, SigningEngine};

/// Version of qiyi
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
