//! Stream transport abstraction and reconnect policy.
//!
//! The client never talks to a socket directly: it asks a [`StreamTransport`]
//! to open the stream and receives raw byte chunks back. The HTTP
//! implementation uses reqwest; tests inject a scripted transport.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use tracing::{debug, info};

use crate::session::{SessionContext, CLIENT_ID_HEADER};

// ============================================================================
// Constants
// ============================================================================

/// Delay used by browsers' EventSource before reconnecting.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Cap for the exponential curve when none is configured.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Connect timeout for the stream request. The body itself never times out.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("unexpected content type: {0}")]
    ContentType(String),
    #[error("invalid stream configuration: {0}")]
    Config(String),
}

impl TransportError {
    pub fn connection<E: std::fmt::Display>(err: E) -> Self {
        TransportError::Connection(err.to_string())
    }

    /// Whether reconnecting can help. Client errors, a non-SSE content type
    /// and bad configuration close the stream for good; server errors,
    /// timeouts and throttling are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            TransportError::ContentType(_) | TransportError::Config(_) => false,
            TransportError::Connection(_) | TransportError::Stream(_) => true,
        }
    }
}

// ============================================================================
// Reconnect policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every attempt.
    Fixed,
    /// Delay doubles per consecutive failure, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts allowed before giving up. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
    pub initial_delay: Duration,
    pub backoff: Backoff,
    /// Let a server `retry:` field replace `initial_delay`.
    pub honor_server_retry: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
            honor_server_retry: true,
        }
    }
}

impl ReconnectPolicy {
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            backoff: Backoff::Exponential { max_delay },
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Delay before reconnect `attempt` (zero-based).
    pub fn delay(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        let base = match server_hint {
            Some(hint) if self.honor_server_retry => hint,
            _ => self.initial_delay,
        };
        match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential { max_delay } => {
                let factor = 2_u32.saturating_pow(attempt.min(16));
                base.saturating_mul(factor).min(max_delay)
            }
        }
    }
}

// ============================================================================
// Transport trait
// ============================================================================

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Capability to open a one-way event stream.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open the stream at `url`. `last_event_id` is sent back to the server
    /// when resuming after a reconnect.
    async fn open(
        &self,
        url: &str,
        last_event_id: Option<&str>,
    ) -> Result<ChunkStream, TransportError>;
}

// ============================================================================
// HTTP transport
// ============================================================================

/// reqwest-backed SSE transport.
pub struct HttpStreamTransport {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpStreamTransport {
    pub fn new(session: &SessionContext) -> Result<Self, TransportError> {
        Self::with_connect_timeout(session, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(
        session: &SessionContext,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| TransportError::Config(format!("failed to create HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(
            CLIENT_ID_HEADER,
            HeaderValue::from_str(session.client_id())
                .map_err(|e| TransportError::Config(format!("invalid client id header: {e}")))?,
        );

        Ok(Self { client, headers })
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn open(
        &self,
        url: &str,
        last_event_id: Option<&str>,
    ) -> Result<ChunkStream, TransportError> {
        let mut request = self.client.get(url).headers(self.headers.clone());
        if let Some(id) = last_event_id.filter(|id| !id.is_empty()) {
            request = request.header("Last-Event-ID", id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::connection(format!("failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_event_stream(&content_type) {
            return Err(TransportError::ContentType(if content_type.is_empty() {
                "missing".to_string()
            } else {
                content_type
            }));
        }

        info!("connected to {}", url);
        debug!("content-type: {}", content_type);

        let chunks = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Stream(e.to_string()))
        });
        Ok(Box::pin(chunks))
    }
}

fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("text/event-stream"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_retries_forever_with_fixed_delay() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(10_000));
        assert_eq!(policy.delay(0, None), DEFAULT_RETRY_DELAY);
        assert_eq!(policy.delay(7, None), DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_server_retry_hint_overrides_initial_delay() {
        let policy = ReconnectPolicy::default();
        let hint = Some(Duration::from_millis(250));
        assert_eq!(policy.delay(0, hint), Duration::from_millis(250));

        let ignoring = ReconnectPolicy {
            honor_server_retry: false,
            ..Default::default()
        };
        assert_eq!(ignoring.delay(0, hint), DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy =
            ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_millis(1000));

        assert_eq!(policy.delay(0, None), Duration::from_millis(100));
        assert_eq!(policy.delay(1, None), Duration::from_millis(200));
        assert_eq!(policy.delay(2, None), Duration::from_millis(400));
        assert_eq!(policy.delay(4, None), Duration::from_millis(1000));
        assert_eq!(policy.delay(40, None), Duration::from_millis(1000));
    }

    #[test]
    fn test_max_attempts() {
        let policy = ReconnectPolicy::default().with_max_attempts(2);
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }

    #[tokio::test]
    async fn test_http_transport_streams_body_with_headers() {
        use crate::stream::SseDecoder;
        use httpmock::Method::GET;
        use httpmock::MockServer;

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/events/stream")
                .query_param("channel", "default")
                .header("accept", "text/event-stream")
                .header("x-user-id", "client-abc")
                .header("last-event-id", "41");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("id: 42\nevent: lance_v\ndata: {\"id\": 1}\n\n");
        });

        let transport = HttpStreamTransport::new(&SessionContext::new("client-abc"))
            .expect("transport should initialize");
        let mut chunks = transport
            .open(&server.url("/events/stream?channel=default"), Some("41"))
            .await
            .expect("stream should open");

        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        while let Some(chunk) = chunks.next().await {
            frames.extend(decoder.feed(&chunk.expect("chunk should be readable")));
        }

        mock.assert();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, "lance_v");
        assert_eq!(frames[0].data, "{\"id\": 1}");
        assert_eq!(decoder.last_event_id(), Some("42"));
    }

    #[tokio::test]
    async fn test_http_transport_reports_status() {
        use httpmock::Method::GET;
        use httpmock::MockServer;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/events/stream");
            then.status(503).body("unavailable");
        });

        let transport = HttpStreamTransport::new(&SessionContext::new("client-abc"))
            .expect("transport should initialize");
        let err = match transport.open(&server.url("/events/stream"), None).await {
            Ok(_) => panic!("non-2xx response should fail"),
            Err(e) => e,
        };

        match err {
            TransportError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(TransportError::Connection("refused".into()).is_retryable());
        assert!(TransportError::Http {
            status: 502,
            message: String::new()
        }
        .is_retryable());
        assert!(!TransportError::Config("bad".into()).is_retryable());
        assert!(!TransportError::Http {
            status: 404,
            message: String::new()
        }
        .is_retryable());
        assert!(TransportError::Http {
            status: 429,
            message: String::new()
        }
        .is_retryable());
        assert!(!TransportError::ContentType("text/html".into()).is_retryable());
    }

    #[test]
    fn test_event_stream_content_type() {
        assert!(is_event_stream("text/event-stream"));
        assert!(is_event_stream("Text/Event-Stream; charset=utf-8"));
        assert!(!is_event_stream("text/html"));
        assert!(!is_event_stream(""));
    }

    #[tokio::test]
    async fn test_http_transport_rejects_non_sse_response() {
        use httpmock::Method::GET;
        use httpmock::MockServer;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/events/stream");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html></html>");
        });

        let transport = HttpStreamTransport::new(&SessionContext::new("client-abc"))
            .expect("transport should initialize");
        let err = match transport.open(&server.url("/events/stream"), None).await {
            Ok(_) => panic!("html response should be rejected"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::ContentType(ref ct) if ct == "text/html"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_http_transport_omits_empty_last_event_id() {
        use httpmock::Method::GET;
        use httpmock::MockServer;

        let server = MockServer::start();
        let with_header = server.mock(|when, then| {
            when.method(GET)
                .path("/events/stream")
                .header_exists("last-event-id");
            then.status(500);
        });
        let without_header = server.mock(|when, then| {
            when.method(GET).path("/events/stream");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body("");
        });

        let transport = HttpStreamTransport::new(&SessionContext::new("client-abc"))
            .expect("transport should initialize");
        let opened = transport.open(&server.url("/events/stream"), Some("")).await;

        assert!(opened.is_ok());
        with_header.assert_hits(0);
        without_header.assert_hits(1);
    }
}
