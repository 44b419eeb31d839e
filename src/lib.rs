#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! A pooled, retrying HTTP/1.1 client core.
//!
//! - URL parsing and an origin key for connection pooling ([`url`])
//! - A hand-rolled wire codec: request serialization, status-line/header
//!   parsing, chunked/content-length/close framing, gzip/deflate
//!   decompression, and an incremental Server-Sent Events reader
//!   ([`codec`])
//! - A per-origin bounded connection pool with idle eviction and a FIFO
//!   waiter queue ([`pool`])
//! - Jittered exponential backoff retry ([`retry`]) and a sliding-window
//!   admission limiter ([`rate_limit`])
//! - TLS via rustls, with native root certificates cached process-wide
//!   ([`tls`])
//! - A request executor tying all of the above together, including
//!   redirect traversal and SSE streaming ([`executor`])
//! - A suspending [`Client`] and a [`BlockingClient`] wrapper over the
//!   same executor, plus a fluent [`ClientBuilder`]
//!
//! # Example
//!
//! ```ignore
//! use corehttp::Client;
//!
//! let client = Client::builder().max_retries(5).build()?;
//! let response = client.get("https://example.com/").await?;
//! println!("{}", response.text()?);
//! ```

mod builder;
mod client;
pub mod codec;
mod config;
mod connection;
mod error;
mod executor;
mod headers;
pub mod otel;
mod pool;
mod rate_limit;
mod request;
mod response;
pub mod security;
mod retry;
mod tls;
mod url;

pub use builder::ClientBuilder;
pub use client::{BlockingClient, Client};
pub use codec::sse::SseEvent;
pub use config::{ClientConfig, DEFAULT_MAX_HEADER_BYTES, DEFAULT_USER_AGENT};
pub use error::{HttpError, InvalidUrlKind, TimeoutPhase};
pub use headers::HeaderMap;
pub use pool::PoolConfig;
pub use rate_limit::RateLimitConfig;
pub use request::{Method, Request, RequestBuilder};
pub use response::Response;
pub use retry::RetryConfig;
pub use url::{Origin, Scheme, UrlInfo};
