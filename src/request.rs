//! The `Request` value the executor consumes, and a fluent builder the
//! client façade hands back to callers — the builder validates and defers
//! errors to `build()`/`send()` rather than returning `Result` from every
//! setter, matching the deferred-error pattern this crate family uses.

use crate::error::HttpError;
use crate::headers::HeaderMap;
use bytes::Bytes;
use std::time::Duration;

/// HTTP methods this core knows how to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }

    /// Idempotent methods are eligible for retry without an explicit
    /// idempotency key; POST/PATCH are not.
    #[must_use]
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Method::Post | Method::Patch)
    }
}

/// An immutable-after-construction request, as the executor sees it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

enum DeferredBody {
    Empty,
    Bytes(Bytes),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Fluent request builder returned by `Client::get`/`post`/etc. Setter
/// methods that can fail (JSON serialization) record the first error and
/// surface it from `build()` instead of interrupting the chain.
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: DeferredBody,
    timeout: Option<Duration>,
    error: Option<HttpError>,
}

impl RequestBuilder {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        RequestBuilder {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: DeferredBody::Empty,
            timeout: None,
            error: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn body(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body = DeferredBody::Bytes(bytes.into());
        self
    }

    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => self.body = DeferredBody::Json(v),
            Err(e) => {
                self.error.get_or_insert(HttpError::Json(e));
            }
        }
        self
    }

    #[must_use]
    pub fn form(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.body = DeferredBody::Form(pairs.into_iter().collect());
        self
    }

    /// Resolve the deferred body and any accumulated setter error into a
    /// finished `Request`.
    pub fn build(mut self) -> Result<Request, HttpError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let body = match self.body {
            DeferredBody::Empty => None,
            DeferredBody::Bytes(b) => Some(b),
            DeferredBody::Json(v) => {
                if !self.headers.contains("content-type") {
                    self.headers.append("Content-Type", "application/json");
                }
                Some(Bytes::from(serde_json::to_vec(&v)?))
            }
            DeferredBody::Form(pairs) => {
                if !self.headers.contains("content-type") {
                    self.headers.append("Content-Type", "application/x-www-form-urlencoded");
                }
                Some(Bytes::from(serde_urlencoded::to_string(pairs)?))
            }
        };

        Ok(Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body,
            timeout: self.timeout,
        })
    }
}
