use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{
    Client, Proxy, RequestBuilder, Response, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::{OpenedStream, RetryAction, RetryPolicy, Transport, TransportError, retry_with_backoff};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Configurable options for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Timeout between two reads of a response body.
    pub read_timeout: Duration,
    pub user_agent: String,
    /// Raw `Cookie` header sent with every request.
    pub cookie: Option<String>,
    /// Referer sent instead of the per-request one.
    pub referer: Option<String>,
    /// Proxy url for every request, `http://`, `https://` or `socks5://`.
    pub proxy: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            cookie: None,
            referer: None,
            proxy: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpConfig {
    pub fn default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            header::ACCEPT_CHARSET,
            HeaderValue::from_static("UTF-8,*;q=0.5"),
        );
        default_headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.8"),
        );
        default_headers
    }
}

/// Proxy url for `addr` in `scheme`, keeping a scheme already present.
///
/// `proxy_url("socks5", "127.0.0.1:1080")` gives `socks5://127.0.0.1:1080`.
pub fn proxy_url(scheme: &str, addr: &str) -> String {
    let addr = addr.trim();
    if addr.contains("://") {
        addr.to_owned()
    } else {
        format!("{scheme}://{addr}")
    }
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        // Bodies are stored as sent so that sizes on disk match Content-Length.
        let mut builder = Client::builder()
            .default_headers(HttpConfig::default_headers())
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .no_gzip()
            .no_deflate()
            .no_brotli();
        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.as_str()).map_err(|source| TransportError::InvalidProxy {
                proxy: proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn request(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &FxHashMap<String, String>,
    ) -> Result<RequestBuilder, TransportError> {
        let referer = self.config.referer.as_deref().or(referer).unwrap_or(url);
        let mut builder = self.client.get(url).header(header::REFERER, referer);
        let has_cookie = headers.keys().any(|name| name.eq_ignore_ascii_case("cookie"));
        if let Some(cookie) = self.config.cookie.as_deref().filter(|_| !has_cookie) {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader { name: name.clone() })?;
            let value = HeaderValue::from_str(value).map_err(|_| TransportError::InvalidHeader {
                name: name.to_string(),
            })?;
            builder = builder.header(name, value);
        }
        Ok(builder)
    }

    /// Sends the request, retrying transient failures. Any status >= 400 is
    /// an error.
    async fn send(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &FxHashMap<String, String>,
    ) -> Result<Response, TransportError> {
        let url_owned = url.to_owned();
        retry_with_backoff(&self.config.retry, |attempt| {
            let request = self.request(url, referer, headers);
            let url = url_owned.clone();
            async move {
                let request = match request {
                    Ok(request) => request,
                    Err(e) => return RetryAction::Fail(e),
                };
                debug!(url = %url, attempt, "GET");
                let result = match request.send().await {
                    Ok(resp)
                        if resp.status().is_client_error() || resp.status().is_server_error() =>
                    {
                        Err(TransportError::status(url, resp.status()))
                    }
                    Ok(resp) => Ok(resp),
                    Err(e) => Err(TransportError::request(url, e)),
                };
                RetryAction::from(result)
            }
        })
        .await
    }
}

fn header_u64(resp: &Response, name: HeaderName) -> Option<u64> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Total length from a `Content-Range: bytes 100-199/1234` header.
fn content_range_total(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('/').next())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        referer: Option<&str>,
        headers: &FxHashMap<String, String>,
    ) -> Result<Bytes, TransportError> {
        let resp = self.send(url, referer, headers).await?;
        resp.bytes()
            .await
            .map_err(|e| TransportError::request(url, e))
    }

    async fn size_of(&self, url: &str, referer: Option<&str>) -> Result<u64, TransportError> {
        let resp = self.send(url, referer, &FxHashMap::default()).await?;
        header_u64(&resp, header::CONTENT_LENGTH).ok_or_else(|| {
            TransportError::MissingContentLength {
                url: url.to_owned(),
            }
        })
    }

    async fn content_type(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String, TransportError> {
        let resp = self.send(url, referer, &FxHashMap::default()).await?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok(content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned())
    }

    async fn open_stream(
        &self,
        url: &str,
        referer: Option<&str>,
        offset: u64,
        end: Option<u64>,
    ) -> Result<OpenedStream, TransportError> {
        let range = match (offset, end) {
            (0, None) => None,
            (offset, None) => Some(format!("bytes={offset}-")),
            (offset, Some(end)) => Some(format!("bytes={offset}-{end}")),
        };
        let mut headers = FxHashMap::default();
        if let Some(range) = &range {
            headers.insert(header::RANGE.as_str().to_owned(), range.clone());
        }
        let resp = self.send(url, referer, &headers).await?;

        let partial = range.is_some() && resp.status() == StatusCode::PARTIAL_CONTENT;
        let (offset, end, total) = if partial {
            (offset, end, content_range_total(&resp))
        } else {
            (0, None, header_u64(&resp, header::CONTENT_LENGTH))
        };

        let url = url.to_owned();
        let stream = resp
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| TransportError::request(url.clone(), e)))
            .boxed();
        Ok(OpenedStream {
            stream,
            offset,
            end,
            total,
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answers every connection with `response` and records request heads.
    struct TestServer {
        url: String,
        hits: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    async fn serve(response: &'static str) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/media/clip.mp4", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (hits_task, requests_task) = (hits.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                hits_task.fetch_add(1, Ordering::SeqCst);
                requests_task
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).to_ascii_lowercase());
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        TestServer {
            url,
            hits,
            requests,
        }
    }

    fn transport(max_retries: u32) -> HttpTransport {
        HttpTransport::new(HttpConfig {
            retry: RetryPolicy {
                max_retries,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                jitter: false,
            },
            ..HttpConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_size_of_compressed_resource() {
        let server = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Encoding: gzip\r\n\
             Content-Length: 20\r\nConnection: close\r\n\r\n01234567890123456789",
        )
        .await;
        let transport = transport(0);

        assert_eq!(transport.size_of(&server.url, None).await.unwrap(), 20);
        let body = transport
            .fetch(&server.url, None, &FxHashMap::default())
            .await
            .unwrap();
        assert_eq!(body.len(), 20);

        let requests = server.requests.lock().unwrap();
        assert!(requests.iter().all(|r| !r.contains("gzip")));
    }

    #[tokio::test]
    async fn test_unavailable_server_is_retried_once_per_policy() {
        let server = serve(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let err = transport(2)
            .open_stream(&server.url, None, 0, None)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TransportError::HttpStatus { .. }));
        assert_eq!(server.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bounded_range_request() {
        let server = serve(
            "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 4-9/20\r\n\
             Content-Length: 6\r\nConnection: close\r\n\r\n456789",
        )
        .await;
        let opened = transport(0)
            .open_stream(&server.url, None, 4, Some(9))
            .await
            .unwrap();

        assert_eq!(opened.offset, 4);
        assert_eq!(opened.end, Some(9));
        assert_eq!(opened.total, Some(20));
        assert!(server.requests.lock().unwrap()[0].contains("range: bytes=4-9"));
    }

    #[tokio::test]
    async fn test_ignored_range_reports_whole_body() {
        let server = serve(
            "HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
        )
        .await;
        let opened = transport(0)
            .open_stream(&server.url, None, 4, Some(7))
            .await
            .unwrap();

        assert_eq!(opened.offset, 0);
        assert_eq!(opened.end, None);
        assert_eq!(opened.total, Some(10));
    }

    #[tokio::test]
    async fn test_request_cookie_replaces_configured_cookie() {
        let server = serve(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        let transport = HttpTransport::new(HttpConfig {
            cookie: Some("sid=config".into()),
            ..HttpConfig::default()
        })
        .unwrap();
        let headers: FxHashMap<String, String> =
            [("Cookie".to_string(), "sid=page".to_string())].into_iter().collect();

        transport.fetch(&server.url, None, &headers).await.unwrap();
        transport
            .fetch(&server.url, None, &FxHashMap::default())
            .await
            .unwrap();

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].contains("cookie: sid=page"));
        assert!(!requests[0].contains("sid=config"));
        assert!(requests[1].contains("cookie: sid=config"));
    }

    #[test]
    fn test_proxy_config() {
        assert_eq!(proxy_url("socks5", "127.0.0.1:1080"), "socks5://127.0.0.1:1080");
        assert_eq!(proxy_url("http", "https://proxy.test:3128"), "https://proxy.test:3128");

        let config = HttpConfig {
            proxy: Some(proxy_url("socks5", "127.0.0.1:1080")),
            ..HttpConfig::default()
        };
        assert!(HttpTransport::new(config).is_ok());

        let config = HttpConfig {
            proxy: Some("http://[::1".into()),
            ..HttpConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(config),
            Err(TransportError::InvalidProxy { .. })
        ));
    }
}
