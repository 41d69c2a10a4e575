//! Resolver configuration loaded from `~/.config/qiyi/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOMAIN_MARKER: &str = "iqiyi.com";
pub const DEFAULT_ACCELERATOR_URL: &str = "https://mesh.if.iqiyi.com/player/lw/lwplay/accelerator.js";
pub const DEFAULT_DASH_ENDPOINT: &str = "https://cache.video.iqiyi.com/dash";
pub const DEFAULT_DASH_PATH: &str = "/dash";
pub const DEFAULT_PAGE_REFERER: &str = "https://www.iqiyi.com/";

/// Everything the resolver needs to know about its environment.
///
/// Every field has a default, so an empty or partial TOML file is valid.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Substring a URL must contain to be accepted.
    pub domain_marker: String,
    /// Auxiliary endpoint probed first for tvid/vid.
    pub accelerator_url: String,
    /// Stream manifest endpoint.
    pub dash_endpoint: String,
    /// Path prefix the signature is computed over.
    pub dash_path: String,
    /// Referer sent with page fetches.
    pub page_referer: String,
    /// Overrides the browser profile's User-Agent.
    pub user_agent: Option<String>,
    /// Raw `Cookie` header attached to every request.
    pub cookie: Option<String>,
    /// Signing script. `None` means the default location.
    pub signer_script: Option<PathBuf>,
    pub accelerator_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub api_timeout_secs: u64,
    /// Go straight to page extraction.
    pub skip_accelerator: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            domain_marker: DEFAULT_DOMAIN_MARKER.to_string(),
            accelerator_url: DEFAULT_ACCELERATOR_URL.to_string(),
            dash_endpoint: DEFAULT_DASH_ENDPOINT.to_string(),
            dash_path: DEFAULT_DASH_PATH.to_string(),
            page_referer: DEFAULT_PAGE_REFERER.to_string(),
            user_agent: None,
            cookie: None,
            signer_script: None,
            accelerator_timeout_secs: 10,
            page_timeout_secs: 15,
            api_timeout_secs: 15,
            skip_accelerator: false,
        }
    }
}

impl ResolverConfig {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Check a URL against the domain marker.
    pub fn accepts(&self, url: &str) -> bool {
        url.contains(&self.domain_marker)
    }

    /// Signing script location, falling back to `~/.config/qiyi/signer.js`.
    pub fn signer_script_path(&self) -> PathBuf {
        self.signer_script
            .clone()
            .unwrap_or_else(|| config_dir().join("signer.js"))
    }

    pub fn accelerator_timeout(&self) -> Duration {
        Duration::from_secs(self.accelerator_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Render as TOML for `qiyi config`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qiyi")
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: ResolverConfig = toml::from_str("").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.page_timeout(), Duration::from_secs(15));
        assert_eq!(config.accelerator_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
domain_marker = "example-platform.com"
cookie = "P00001=abc"
api_timeout_secs = 5
skip_accelerator = true
"#;
        let config: ResolverConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.domain_marker, "example-platform.com");
        assert_eq!(config.cookie.as_deref(), Some("P00001=abc"));
        assert_eq!(config.api_timeout(), Duration::from_secs(5));
        assert!(config.skip_accelerator);
        assert_eq!(config.dash_endpoint, DEFAULT_DASH_ENDPOINT);
    }

    #[test]
    fn domain_marker_gates_urls() {
        let config = ResolverConfig::default();
        assert!(config.accepts("https://www.iqiyi.com/v_19rrok4nt0.html"));
        assert!(!config.accepts("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn explicit_signer_path_wins() {
        let config = ResolverConfig {
            signer_script: Some(PathBuf::from("/opt/signer.js")),
            ..ResolverConfig::default()
        };
        assert_eq!(config.signer_script_path(), PathBuf::from("/opt/signer.js"));
    }

    #[test]
    fn load_from_reports_invalid_toml() {
        let path = std::env::temp_dir().join(format!("qiyi-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "domain_marker = [").unwrap();
        let err = ResolverConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn toml_round_trip_keeps_overrides() {
        let config = ResolverConfig {
            page_timeout_secs: 7,
            ..ResolverConfig::default()
        };
        let rendered = config.to_toml().unwrap();
        let parsed: ResolverConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.page_timeout_secs, 7);
    }
}
