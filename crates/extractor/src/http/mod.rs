//! HTTP access used by extractors and the downloader.
//!
//! Everything goes through the [`Transport`] trait so extractors and the
//! download path can be exercised against in-memory fakes.

pub mod client;
pub mod error;
pub mod retry;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use rustc_hash::FxHashMap;

pub use client::{DEFAULT_USER_AGENT, HttpConfig, HttpTransport, proxy_url};
pub use error::TransportError;
pub use retry::{RetryAction, RetryPolicy, retry_with_backoff};

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A body stream opened at some byte offset.
pub struct OpenedStream {
    pub stream: ByteStream,
    /// Offset the body actually starts at. `0` when the server ignored the
    /// requested range and sent the whole resource.
    pub offset: u64,
    /// Last byte of the body, inclusive, when a bounded range was honoured.
    /// `None` means the body runs to the end of the resource.
    pub end: Option<u64>,
    /// Total resource length when the server reported it.
    pub total: Option<u64>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the whole body.
    ///
    /// `referer` defaults to the url itself when `None`.
    async fn fetch(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &FxHashMap<String, String>,
    ) -> Result<Bytes, TransportError>;

    /// Byte length of the resource at `url`, without reading the body.
    async fn size_of(&self, url: &str, referer: Option<&str>) -> Result<u64, TransportError>;

    /// Media type of the resource at `url`, without parameters.
    async fn content_type(&self, url: &str, referer: Option<&str>)
    -> Result<String, TransportError>;

    /// Open the body of `url` from byte `offset` up to byte `end` inclusive,
    /// or to the end of the resource when `end` is `None`.
    ///
    /// Implementations retry failed requests themselves; errors returned here
    /// are final for this request.
    async fn open_stream(
        &self,
        url: &str,
        referer: Option<&str>,
        offset: u64,
        end: Option<u64>,
    ) -> Result<OpenedStream, TransportError>;

    /// Policy used by callers that resume transfers cut off mid-body.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}
