//! The client façade (component C8): a suspending `Client` plus a
//! `BlockingClient` wrapper, both driving the same `executor::execute`/
//! `executor::stream_events` so the two surfaces never diverge in
//! behavior.
//!
//! Connection pool sizing, TLS trust material, and rate-limiter capacity
//! are fixed at construction time — rebuilding them on `set_config` would
//! mean draining in-flight connections, which is out of scope for this
//! core. `set_config`/`get_config` swap the `Arc<ClientConfig>` snapshot
//! used for everything else (timeouts, retry, redirects, compression,
//! body caps, headers); `enable_rate_limit` and `enable_connection_pool`
//! are read from that live snapshot on every call, so toggling either on
//! or off does take effect immediately even though the underlying pool
//! and limiter objects are not rebuilt.

use crate::codec::sse::SseEvent;
use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::executor;
use crate::otel;
use crate::pool::ConnectionPool;
use crate::rate_limit::RateLimiter;
use crate::request::{Method, Request, RequestBuilder};
use crate::response::Response;
use crate::tls;
use bytes::Bytes;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use tokio_rustls::TlsConnector;
use tracing::Instrument;

/// A suspending HTTP/1.1 client: connection pool, TLS context, and rate
/// limiter, shared across every request issued through it.
pub struct Client {
    config: Mutex<Arc<ClientConfig>>,
    pool: ConnectionPool,
    tls_connector: TlsConnector,
    rate_limiter: RateLimiter,
}

impl Client {
    /// Build a client with default configuration.
    ///
    /// # Errors
    /// Returns an error if the TLS trust store cannot be assembled (see
    /// `tls::client_config_for`).
    pub fn new() -> Result<Self, HttpError> {
        Client::from_config(ClientConfig::default())
    }

    /// Start a fluent builder.
    #[must_use]
    pub fn builder() -> crate::builder::ClientBuilder {
        crate::builder::ClientBuilder::new()
    }

    pub(crate) fn from_config(config: ClientConfig) -> Result<Self, HttpError> {
        let tls_connector = tls::connector_for(&config)?;
        let pool = ConnectionPool::new(config.pool_config());
        let rate_limiter = RateLimiter::new(config.rate_limit_config());
        Ok(Client {
            config: Mutex::new(Arc::new(config)),
            pool,
            tls_connector,
            rate_limiter,
        })
    }

    fn snapshot(&self) -> Arc<ClientConfig> {
        self.config.lock().expect("client config mutex poisoned").clone()
    }

    /// Current configuration snapshot. Requests already in flight keep
    /// whatever snapshot they started with.
    #[must_use]
    pub fn get_config(&self) -> Arc<ClientConfig> {
        self.snapshot()
    }

    /// Replace the configuration used by requests issued from now on. See
    /// the module doc comment for what does and does not take effect
    /// immediately.
    pub fn set_config(&self, config: ClientConfig) {
        *self.config.lock().expect("client config mutex poisoned") = Arc::new(config);
    }

    /// Begin building a request with a method and URL other than the
    /// `get`/`post`/etc. shorthands below (for custom headers, a JSON or
    /// form body, or a per-request timeout).
    #[must_use]
    pub fn request(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Execute a fully built `Request`.
    pub async fn execute(&self, request: Request) -> Result<Response, HttpError> {
        let config = self.snapshot();
        let rate_limiter = config.enable_rate_limit.then_some(&self.rate_limiter);
        let span = otel::request_span(request.method.as_str(), &request.url);

        let result = async {
            let mut request = request;
            otel::inject_current_span(&mut request.headers);
            executor::execute(&request, &config, &self.pool, Some(&self.tls_connector), rate_limiter).await
        }
        .instrument(span.clone())
        .await;

        otel::record_outcome(&span, result.as_ref().ok().map(|r| r.status), result.is_err());
        result
    }

    pub async fn get(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.execute(Request::new(Method::Get, url)).await
    }

    pub async fn post(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        let mut request = Request::new(Method::Post, url);
        request.body = Some(body.into());
        self.execute(request).await
    }

    pub async fn put(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        let mut request = Request::new(Method::Put, url);
        request.body = Some(body.into());
        self.execute(request).await
    }

    pub async fn patch(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        let mut request = Request::new(Method::Patch, url);
        request.body = Some(body.into());
        self.execute(request).await
    }

    pub async fn delete(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.execute(Request::new(Method::Delete, url)).await
    }

    pub async fn head(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.execute(Request::new(Method::Head, url)).await
    }

    pub async fn options(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.execute(Request::new(Method::Options, url)).await
    }

    /// Stream Server-Sent Events from `request`, invoking `on_event` for
    /// each dispatched event until the body ends or `on_event` returns
    /// `ControlFlow::Break`. Never uses the connection pool or the retry
    /// loop — see `executor::stream_events`.
    pub async fn stream_events<F>(&self, request: Request, on_event: F) -> Result<(), HttpError>
    where
        F: FnMut(SseEvent) -> ControlFlow<()>,
    {
        let config = self.snapshot();
        executor::stream_events(&request, &config, Some(&self.tls_connector), on_event).await
    }
}

/// Drives the same `Client` from synchronous code by spinning up a fresh
/// current-thread `tokio` runtime for each call. Intended for callers
/// embedded in an otherwise-blocking codebase; do not use from inside an
/// existing async runtime (nested runtimes panic).
pub struct BlockingClient {
    inner: Client,
}

impl BlockingClient {
    /// # Errors
    /// See `Client::new`.
    pub fn new() -> Result<Self, HttpError> {
        Ok(BlockingClient { inner: Client::new()? })
    }

    /// Wrap an already-built suspending `Client`.
    #[must_use]
    pub fn from_client(inner: Client) -> Self {
        BlockingClient { inner }
    }

    /// The wrapped suspending client, for callers that want both surfaces.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to start a current-thread runtime for a blocking call");
        rt.block_on(fut)
    }

    /// Drive any suspending computation to completion on a dedicated
    /// runtime, not just the HTTP operations below.
    pub fn run<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.block_on(fut)
    }

    pub fn get_config(&self) -> Arc<ClientConfig> {
        self.inner.get_config()
    }

    pub fn set_config(&self, config: ClientConfig) {
        self.inner.set_config(config);
    }

    pub fn execute(&self, request: Request) -> Result<Response, HttpError> {
        self.block_on(self.inner.execute(request))
    }

    pub fn get(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.block_on(self.inner.get(url))
    }

    pub fn post(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        self.block_on(self.inner.post(url, body))
    }

    pub fn put(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        self.block_on(self.inner.put(url, body))
    }

    pub fn patch(&self, url: impl Into<String>, body: impl Into<Bytes>) -> Result<Response, HttpError> {
        self.block_on(self.inner.patch(url, body))
    }

    pub fn delete(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.block_on(self.inner.delete(url))
    }

    pub fn head(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.block_on(self.inner.head(url))
    }

    pub fn options(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.block_on(self.inner.options(url))
    }

    pub fn stream_events<F>(&self, request: Request, on_event: F) -> Result<(), HttpError>
    where
        F: FnMut(SseEvent) -> ControlFlow<()>,
    {
        self.block_on(self.inner.stream_events(request, on_event))
    }
}
