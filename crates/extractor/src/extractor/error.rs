use thiserror::Error;

use crate::http::TransportError;

#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The page did not contain what the extractor looks for.
    #[error("failed to parse {url}: {reason}")]
    ParseFailure { url: String, reason: String },
    #[error(transparent)]
    Network(#[from] TransportError),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no extractor supports {0}")]
    UnsupportedUrl(String),
    #[error("invalid playlist {url}: {reason}")]
    Playlist { url: String, reason: String },
    #[error("extraction task for {0} did not complete")]
    TaskFailed(String),
}

impl ExtractorError {
    pub fn parse_failure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn playlist(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Playlist {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
