use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    HttpStatus { status: StatusCode, url: String },
    #[error("{url} did not report a content length")]
    MissingContentLength { url: String },
    #[error("transfer of {url} stopped after {received} of {expected} bytes")]
    Interrupted {
        url: String,
        received: u64,
        expected: u64,
    },
    #[error("invalid header value for {name}")]
    InvalidHeader { name: String },
    #[error("invalid proxy {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    pub fn status(url: impl Into<String>, status: StatusCode) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Transient failures worth another attempt: connect and timeout errors,
    /// server errors and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { source, .. } => is_retryable_reqwest_error(source),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Interrupted { .. } => true,
            Self::MissingContentLength { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidProxy { .. }
            | Self::Other(_) => false,
        }
    }

    /// Failures after the response started, while reading the body. The
    /// request itself already went through the transport's retries, so
    /// only these are worth resuming from the bytes received so far.
    pub fn is_mid_body(&self) -> bool {
        match self {
            Self::Interrupted { .. } => true,
            Self::Request { source, .. } => source.is_body() || source.is_decode(),
            _ => false,
        }
    }
}

/// Classify a reqwest error as retryable or non-retryable.
///
/// Retryable: connect, timeout, request, body read, and decode errors.
/// Non-retryable: redirect and builder errors.
pub fn is_retryable_reqwest_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() || e.is_decode()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(TransportError::status("u", StatusCode::BAD_GATEWAY).is_retryable());
        assert!(TransportError::status("u", StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!TransportError::status("u", StatusCode::NOT_FOUND).is_retryable());
        assert!(!TransportError::MissingContentLength { url: "u".into() }.is_retryable());
    }

    #[test]
    fn test_mid_body_classification() {
        let interrupted = TransportError::Interrupted {
            url: "u".into(),
            received: 3,
            expected: 9,
        };
        assert!(interrupted.is_mid_body());
        assert!(!TransportError::status("u", StatusCode::SERVICE_UNAVAILABLE).is_mid_body());
        assert!(!TransportError::Other("x".into()).is_mid_body());
    }
}
