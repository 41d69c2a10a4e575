//! Resolution errors and their wire names.

use serde::Serialize;
use thiserror::Error;

/// Errors that terminate a resolution.
///
/// Only the first three ever reach a caller through
/// [`VideoResolutionResult`](crate::iqiyi::VideoResolutionResult); the rest
/// are raised by setup code (config loading, client construction) before a
/// pipeline exists.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("not a valid iQiyi link: {0}")]
    InvalidUrl(String),

    #[error("could not extract video ids, the video may be private or the link invalid")]
    IdExtractionFailed,

    #[error("parsing failed: {message}")]
    Parsing { message: String, details: String },

    #[error("config error: {0}")]
    Config(String),
}

impl ResolveError {
    /// Wrap an unexpected failure, keeping the full cause chain as details.
    pub fn parsing(err: &anyhow::Error) -> Self {
        Self::Parsing {
            message: err.to_string(),
            details: format!("{err:?}"),
        }
    }

    /// Wire-level error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::IdExtractionFailed => ErrorKind::IdExtractionFailed,
            _ => ErrorKind::ParsingFailed,
        }
    }

    /// Diagnostic text for the `details` field, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Parsing { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Error kinds as they appear in the `error_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    IdExtractionFailed,
    ParsingFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::IdExtractionFailed => "id_extraction_failed",
            Self::ParsingFailed => "parsing_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_snake_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::IdExtractionFailed).unwrap(),
            "\"id_extraction_failed\""
        );
        assert_eq!(ErrorKind::InvalidUrl.to_string(), "invalid_url");
    }

    #[test]
    fn setup_errors_surface_as_parsing_failed() {
        let err = ResolveError::Config("bad toml".into());
        assert_eq!(err.kind(), ErrorKind::ParsingFailed);
        assert!(err.details().is_none());
    }

    #[test]
    fn parsing_keeps_cause_chain() {
        let inner = anyhow::anyhow!("socket closed").context("manifest request");
        let err = ResolveError::parsing(&inner);
        assert_eq!(err.kind(), ErrorKind::ParsingFailed);
        assert!(err.details().unwrap().contains("socket closed"));
    }
}
