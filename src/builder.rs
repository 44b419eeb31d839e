//! Fluent `ClientBuilder` (part of component C8): one setter per
//! `ClientConfig` field, deferring validation to `build()` the way
//! `RequestBuilder` defers body-serialization errors — `build()` is
//! fallible only because assembling the TLS trust store can fail.

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::HttpError;
use std::time::Duration;

/// Builds a `Client` by starting from `ClientConfig::default()` (or a
/// preset via `from_config`) and overriding individual fields.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder::new()
    }
}

impl ClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        ClientBuilder {
            config: ClientConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. `ClientConfig::minimal()`)
    /// rather than the default.
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        ClientBuilder { config }
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn enable_compression(mut self, enabled: bool) -> Self {
        self.config.enable_compression = enabled;
        self
    }

    #[must_use]
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.config.verify_ssl = verify;
        self
    }

    #[must_use]
    pub fn ca_cert_file(mut self, path: impl Into<String>) -> Self {
        self.config.ca_cert_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.config.ca_cert_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    #[must_use]
    pub fn enable_connection_pool(mut self, enabled: bool) -> Self {
        self.config.enable_connection_pool = enabled;
        self
    }

    #[must_use]
    pub fn max_connections_per_host(mut self, max: usize) -> Self {
        self.config.max_connections_per_host = max;
        self
    }

    #[must_use]
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keepalive_timeout = timeout;
        self
    }

    #[must_use]
    pub fn enable_rate_limit(mut self, enabled: bool) -> Self {
        self.config.enable_rate_limit = enabled;
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, requests: usize, window: Duration) -> Self {
        self.config.rate_limit_requests = requests;
        self.config.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn enable_retry(mut self, enabled: bool) -> Self {
        self.config.enable_retry = enabled;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max: usize) -> Self {
        self.config.max_retries = max;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, initial_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        self.config.initial_retry_delay = initial_delay;
        self.config.max_retry_delay = max_delay;
        self.config.retry_backoff_factor = factor;
        self
    }

    #[must_use]
    pub fn retry_on_timeout(mut self, retry: bool) -> Self {
        self.config.retry_on_timeout = retry;
        self
    }

    #[must_use]
    pub fn retry_on_connection_error(mut self, retry: bool) -> Self {
        self.config.retry_on_connection_error = retry;
        self
    }

    #[must_use]
    pub fn retry_on_5xx(mut self, retry: bool) -> Self {
        self.config.retry_on_5xx = retry;
        self
    }

    #[must_use]
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }

    #[must_use]
    pub fn max_header_bytes(mut self, max: usize) -> Self {
        self.config.max_header_bytes = max;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// # Errors
    /// Returns an error if the TLS trust store cannot be assembled: no
    /// native root certificates found and no `ca_cert_file`/`ca_cert_path`
    /// configured, or a configured CA file/directory could not be read.
    pub fn build(self) -> Result<Client, HttpError> {
        Client::from_config(self.config)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn setters_compose_onto_the_default_config() {
        let client = ClientBuilder::new()
            .verify_ssl(false)
            .max_retries(7)
            .max_redirects(3)
            .build()
            .unwrap();
        let config = client.get_config();
        assert!(!config.verify_ssl);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.max_redirects, 3);
    }

    #[test]
    fn from_config_starts_from_a_preset() {
        let client = ClientBuilder::from_config(ClientConfig::minimal()).build().unwrap();
        let config = client.get_config();
        assert!(!config.enable_connection_pool);
        assert!(!config.enable_retry);
    }

    #[test]
    fn missing_ca_cert_file_fails_build_instead_of_first_request() {
        let err = ClientBuilder::new().ca_cert_file("/nonexistent/ca.pem").build().unwrap_err();
        assert!(matches!(err, HttpError::TlsError { .. }));
    }
}
