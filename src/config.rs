//! Client configuration: one `ClientConfig` per client, copied in at
//! construction. Mutating it later through
//! `Client::set_config` is not observed by requests already in flight —
//! each attempt snapshots an `Arc<ClientConfig>` at the start of
//! `execute`.

use crate::pool::PoolConfig;
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default User-Agent sent when the caller's request does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("corehttp/", env!("CARGO_PKG_VERSION"));

/// Header block cap enforced while scanning for CRLFCRLF, before any
/// header is parsed.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// All client tunables, each with a sensible production default; presets
/// below adjust a handful of them for common deployment shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Max duration for TCP connect, and TLS handshake if applicable.
    pub connect_timeout: Duration,
    /// Max duration between successive read progress events.
    pub read_timeout: Duration,
    /// Max wall-clock duration for one attempt, if set.
    pub request_timeout: Option<Duration>,

    /// Send `Accept-Encoding: gzip, deflate` and decode matching responses.
    pub enable_compression: bool,

    /// Validate the server certificate against the trust store.
    pub verify_ssl: bool,
    /// Additional PEM file of trusted CA certificates.
    pub ca_cert_file: Option<String>,
    /// Additional directory of trusted CA certificates (one PEM per file).
    pub ca_cert_path: Option<String>,

    /// Enable redirect traversal for 3xx responses.
    pub follow_redirects: bool,
    /// Maximum redirect hops before `RedirectLimit`.
    pub max_redirects: usize,

    /// Enable the per-origin connection pool; disabled, every request
    /// opens and closes its own connection.
    pub enable_connection_pool: bool,
    /// Cap on concurrently checked-out-or-idle connections per origin.
    pub max_connections_per_host: usize,
    /// Idle duration after which a pooled connection is evicted.
    pub keepalive_timeout: Duration,

    /// Enable the sliding-window admission throttle.
    pub enable_rate_limit: bool,
    /// Requests admitted per `rate_limit_window`.
    pub rate_limit_requests: usize,
    /// Sliding window duration for the rate limiter.
    pub rate_limit_window: Duration,

    /// Enable retry with exponential backoff on retriable failures.
    pub enable_retry: bool,
    /// Maximum retry attempts per top-level `execute` call.
    pub max_retries: usize,
    /// Backoff delay for the first attempt (attempt 0).
    pub initial_retry_delay: Duration,
    /// Multiplicative backoff growth per attempt.
    pub retry_backoff_factor: f64,
    /// Upper bound on any single backoff delay.
    pub max_retry_delay: Duration,
    /// Retry on a timeout error.
    pub retry_on_timeout: bool,
    /// Retry on a transport-layer connection error.
    pub retry_on_connection_error: bool,
    /// Retry on a 5xx response status.
    pub retry_on_5xx: bool,

    /// Optional upstream HTTP or SOCKS5 proxy URL.
    pub proxy_url: Option<String>,

    /// Cap on the decoded (post-decompression) response body.
    pub max_body_bytes: usize,
    /// Cap on the raw response header block, enforced before parsing.
    pub max_header_bytes: usize,

    /// `User-Agent` value injected by the codec when the caller's
    /// request does not set one.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            request_timeout: None,

            enable_compression: true,

            verify_ssl: true,
            ca_cert_file: None,
            ca_cert_path: None,

            follow_redirects: true,
            max_redirects: 10,

            enable_connection_pool: true,
            max_connections_per_host: 5,
            keepalive_timeout: Duration::from_secs(30),

            enable_rate_limit: false,
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(1),

            enable_retry: true,
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(100),
            retry_backoff_factor: 2.0,
            max_retry_delay: Duration::from_secs(10),
            retry_on_timeout: true,
            retry_on_connection_error: true,
            retry_on_5xx: true,

            proxy_url: None,

            max_body_bytes: 10 * 1024 * 1024,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,

            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Pool, retry, and rate limiting all disabled; a bare request/response
    /// loop with sane timeouts. Useful as a starting point for callers who
    /// want to opt in to each subsystem deliberately.
    #[must_use]
    pub fn minimal() -> Self {
        ClientConfig {
            enable_connection_pool: false,
            enable_retry: false,
            enable_rate_limit: false,
            follow_redirects: false,
            ..ClientConfig::default()
        }
    }

    /// Short timeouts and a handful of fast retries, tuned for exercising
    /// a local mock server in tests rather than a real network peer.
    #[must_use]
    pub fn for_testing() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(2),
            max_retries: 1,
            initial_retry_delay: Duration::from_millis(5),
            max_retry_delay: Duration::from_millis(50),
            keepalive_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    /// Tuned for `stream_events`: retries are disabled (SSE reconnection
    /// is a protocol-level concern for the caller, not a transport retry)
    /// and `read_timeout` is widened since an idle SSE stream can go
    /// quiet between heartbeats without being unhealthy.
    #[must_use]
    pub fn sse() -> Self {
        ClientConfig {
            enable_retry: false,
            read_timeout: Duration::from_secs(300),
            request_timeout: None,
            ..ClientConfig::default()
        }
    }

    pub(crate) fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_per_origin: self.max_connections_per_host,
            keepalive_timeout: self.keepalive_timeout,
        }
    }

    pub(crate) fn retry_config(&self) -> RetryConfig {
        if self.enable_retry {
            RetryConfig {
                max_retries: self.max_retries,
                initial_delay: self.initial_retry_delay,
                max_delay: self.max_retry_delay,
                backoff_factor: self.retry_backoff_factor,
                retry_on_timeout: self.retry_on_timeout,
                retry_on_connection_error: self.retry_on_connection_error,
                retry_on_5xx: self.retry_on_5xx,
            }
        } else {
            RetryConfig::disabled()
        }
    }

    pub(crate) fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_requests,
            window: self.rate_limit_window,
        }
    }
}
