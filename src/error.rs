use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUrlKind {
    /// URL could not be parsed (malformed syntax).
    ParseError,
    /// URL is missing a host.
    MissingHost,
    /// Port component is not a valid port number.
    InvalidPort,
    /// Scheme is not `http` or `https`.
    UnsupportedScheme,
}

/// The phase in which a timeout fired, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimeoutPhase {
    Connect,
    TlsHandshake,
    Read,
    Write,
    Request,
}

/// Every failure mode the core can report, tagged by kind rather than by
/// message text so callers (and the retry policy) can classify without
/// parsing strings.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// URL parse failure or unsupported scheme.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl {
        url: String,
        kind: InvalidUrlKind,
        reason: String,
    },

    /// DNS resolution failure.
    #[error("failed to resolve host '{host}': {source}")]
    ResolveError {
        host: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// TCP connect failure (refused, unreachable, reset).
    #[error("failed to connect to {origin}: {source}")]
    ConnectError {
        origin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// TLS handshake, certificate verification, or mid-stream TLS failure.
    #[error("tls error for {host}: {source}")]
    TlsError {
        host: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A connect/read/request deadline expired.
    #[error("{phase:?} timed out after {duration:?}")]
    Timeout {
        phase: TimeoutPhase,
        duration: Duration,
    },

    /// Malformed status line, headers, chunk framing, truncated response,
    /// or an oversized header block.
    #[error("protocol error: {reason}")]
    ProtocolError { reason: String },

    /// Decompression failure or unknown `Content-Encoding`.
    #[error("failed to decode body with encoding '{encoding}': {reason}")]
    DecodeError { encoding: String, reason: String },

    /// Decoded body exceeded the configured `max_body_bytes`.
    #[error("response body too large: limit {limit} bytes, exceeded at {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Hop count would exceed `max_redirects`.
    #[error("redirect limit of {limit} exceeded")]
    RedirectLimit { limit: usize },

    /// The request task was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// The connection pool is configured to fail fast on exhaustion and did so.
    #[error("connection pool exhausted for origin {origin}")]
    PoolExhausted { origin: String },

    /// JSON (de)serialization failure in a convenience body builder.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL-encoding failure in a convenience body builder.
    #[error("form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// A header name or value could not be used on the wire.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl HttpError {
    /// True if this error represents a deadline expiring, independent of phase.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// True if this error represents a transport-layer failure eligible for
    /// `retry_on_connection_error` (connect/resolve/reset/broken-pipe class
    /// failures) as opposed to a protocol or application-level failure.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            HttpError::ConnectError { .. } | HttpError::ResolveError { .. }
        )
    }

    pub(crate) fn invalid_url(url: impl Into<String>, kind: InvalidUrlKind, reason: impl Into<String>) -> Self {
        HttpError::InvalidUrl {
            url: url.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        HttpError::ProtocolError { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct TestError(&'static str);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for TestError {}

    #[test]
    fn connect_error_preserves_source() {
        let inner = TestError("connection refused");
        let err = HttpError::ConnectError {
            origin: "http://example.com:80".into(),
            source: Box::new(inner),
        };
        let source = err.source().expect("connect error should have a source");
        assert_eq!(source.downcast_ref::<TestError>().unwrap().0, "connection refused");
    }

    #[test]
    fn is_timeout_only_matches_timeout_variant() {
        let err = HttpError::Timeout {
            phase: TimeoutPhase::Read,
            duration: Duration::from_secs(1),
        };
        assert!(err.is_timeout());
        assert!(!HttpError::Cancelled.is_timeout());
    }

    #[test]
    fn is_connection_error_matches_connect_and_resolve() {
        assert!(HttpError::ConnectError {
            origin: "x".into(),
            source: Box::new(TestError("refused"))
        }
        .is_connection_error());
        assert!(HttpError::ResolveError {
            host: "x".into(),
            source: Box::new(TestError("nxdomain"))
        }
        .is_connection_error());
        assert!(!HttpError::Cancelled.is_connection_error());
    }
}
