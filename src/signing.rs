//! Signing engine boundary
//!
//! The stream manifest endpoint only answers requests carrying an `authKey`
//! and a `vf` token derived from two keyed transforms the platform ships in
//! its player script. The resolver treats those transforms as opaque: it only
//! needs something implementing [`SigningEngine`].
//!
//! Not having a signer is a normal state. [`SigningCapability`] records
//! whether one was supplied so the pipeline can skip stream resolution up
//! front instead of failing halfway through.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::js_engine::ScriptSigner;

/// The two keyed transforms behind request signing.
///
/// Implementations must be deterministic for fixed inputs (the `vf` token is
/// recomputed by the server) and safe to call from several resolutions at
/// once.
pub trait SigningEngine: Send + Sync {
    /// Keyed transform used twice to derive `authKey`.
    fn auth(&self, seed: &str) -> Result<String>;

    /// Transform applied to the unsigned query string before it is digested.
    fn add_char(&self, buffer: &str) -> Result<String>;
}

/// Optional signing engine, fixed for the lifetime of a resolver.
#[derive(Clone, Default)]
pub struct SigningCapability {
    engine: Option<Arc<dyn SigningEngine>>,
}

impl SigningCapability {
    pub fn new(engine: Arc<dyn SigningEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// No signer: streams will be skipped.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Load the script signer from `path`.
    ///
    /// A missing or broken script yields an unavailable capability.
    pub fn load_script(path: &Path) -> Self {
        if !path.exists() {
            warn!(path = %path.display(), "Signing script not found, stream resolution disabled");
            return Self::unavailable();
        }

        match ScriptSigner::from_file(path) {
            Ok(signer) => {
                info!(path = %path.display(), "Signing script loaded");
                Self::new(Arc::new(signer))
            }
            Err(e) => {
                warn!(path = %path.display(), "Signing script failed to load: {e:#}");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&dyn SigningEngine> {
        self.engine.as_deref()
    }
}

impl std::fmt::Debug for SigningCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCapability")
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl SigningEngine for Echo {
        fn auth(&self, seed: &str) -> Result<String> {
            Ok(format!("auth({seed})"))
        }

        fn add_char(&self, buffer: &str) -> Result<String> {
            Ok(buffer.to_uppercase())
        }
    }

    #[test]
    fn default_is_unavailable() {
        let cap = SigningCapability::default();
        assert!(!cap.is_available());
        assert!(cap.engine().is_none());
    }

    #[test]
    fn injected_engine_is_used() {
        let cap = SigningCapability::new(Arc::new(Echo));
        assert!(cap.is_available());
        assert_eq!(cap.engine().unwrap().auth("x").unwrap(), "auth(x)");
    }

    #[test]
    fn missing_script_is_not_fatal() {
        let cap = SigningCapability::load_script(Path::new("/nonexistent/qiyi/signer.js"));
        assert!(!cap.is_available());
        assert_eq!(format!("{cap:?}"), "SigningCapability { available: false }");
    }
}
