//! Request executor (component C7): the operation that turns one `Request`
//! into a `Response`, combining connection acquisition, the wire codec,
//! deadlines, redirect traversal, and the retry loop. Both the blocking and
//! suspending client surfaces drive the same `execute`/`stream_events` here.

use crate::codec::sse::{SseEvent, SseParser};
use crate::codec::{self, Deadlines};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::HttpError;
use crate::headers::HeaderMap;
use crate::pool::{ConnectionPool, PooledConnection};
use crate::rate_limit::RateLimiter;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::retry::{AttemptOutcome, RetryState};
use crate::url::{Origin, UrlInfo};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::Instant;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Header names stripped from a redirected request when the target origin
/// differs from the current one.
const SENSITIVE_REDIRECT_HEADERS: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

/// Used in place of an actual infinite deadline; ten years is long enough
/// that nothing in this crate's test or production use ever reaches it.
const EFFECTIVELY_FOREVER: Duration = Duration::from_secs(315_360_000);

/// One checked-out connection, either returned to the pool on completion
/// or closed outright when pooling is disabled for this client.
enum Acquired {
    Pooled(PooledConnection),
    Bare(Connection),
}

impl Acquired {
    fn conn_mut(&mut self) -> &mut Connection {
        match self {
            Acquired::Pooled(p) => p.get_mut(),
            Acquired::Bare(c) => c,
        }
    }

    async fn finish(self, reusable: bool) {
        match self {
            Acquired::Pooled(mut p) => {
                p.mark_reusable(reusable);
                p.release().await;
            }
            Acquired::Bare(mut c) => c.close(),
        }
    }
}

async fn connect_origin(origin: &Origin, config: &ClientConfig, tls: Option<&TlsConnector>) -> Result<Connection, HttpError> {
    let deadline = Instant::now() + config.connect_timeout;
    let conn = Connection::connect(origin, deadline).await?;
    if origin.scheme.is_secure() {
        let connector = tls.ok_or_else(|| HttpError::TlsError {
            host: origin.host.clone(),
            source: Box::new(std::io::Error::other("no TLS connector configured for an https origin")),
        })?;
        conn.handshake(connector, deadline).await
    } else {
        Ok(conn)
    }
}

async fn acquire(origin: &Origin, config: &ClientConfig, pool: &ConnectionPool, tls: Option<&TlsConnector>) -> Result<Acquired, HttpError> {
    if config.enable_connection_pool {
        let conn = pool.acquire(origin, || connect_origin(origin, config, tls)).await?;
        Ok(Acquired::Pooled(PooledConnection::new(pool.clone(), origin.clone(), conn)))
    } else {
        Ok(Acquired::Bare(connect_origin(origin, config, tls).await?))
    }
}

fn strip_sensitive_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !SENSITIVE_REDIRECT_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn attempt_deadline(request: &Request, config: &ClientConfig) -> Instant {
    let timeout = request.timeout.or(config.request_timeout).unwrap_or(EFFECTIVELY_FOREVER);
    Instant::now() + timeout
}

/// One attempt: connect (or reuse), send, receive, and recurse through any
/// redirects. Retries live one level up, in `execute`.
fn run_attempt<'a>(
    request: &'a Request,
    config: &'a ClientConfig,
    pool: &'a ConnectionPool,
    tls: Option<&'a TlsConnector>,
    hops_so_far: usize,
    redirect_chain: Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, HttpError>> + Send + 'a>> {
    Box::pin(async move {
        let url = UrlInfo::parse(&request.url)?;
        let origin = url.origin();
        let overall_deadline = attempt_deadline(request, config);

        let mut acquired = acquire(&origin, config, pool, tls).await?;

        let write_buf = codec::serialize_request(request, &url, &config.user_agent, config.enable_compression);
        let outcome = async {
            let conn = acquired.conn_mut();
            conn.write_all(&write_buf, overall_deadline).await?;
            let deadlines = Deadlines::new(overall_deadline, config.read_timeout);
            codec::read_response(conn, config.max_header_bytes, config.max_body_bytes, &deadlines).await
        }
        .await;

        let reusable = matches!(&outcome, Ok(raw) if raw.connection_reusable);
        acquired.finish(reusable).await;
        let raw = outcome?;

        let status = raw.head.status;
        let mut redirect_chain = redirect_chain;

        if (300..400).contains(&status) && config.follow_redirects {
            if let Some(location) = raw.head.headers.get("location") {
                if !location.is_empty() {
                    if hops_so_far >= config.max_redirects {
                        return Err(HttpError::RedirectLimit { limit: config.max_redirects });
                    }

                    let next_url = crate::url::resolve_location(&url, location)?;
                    let next_origin = next_url.origin();
                    let mut next_headers = request.headers.clone();
                    if next_origin != origin {
                        next_headers = strip_sensitive_headers(&next_headers);
                    }
                    let next_method = if request.method == Method::Head { Method::Head } else { Method::Get };

                    debug!(from = %origin, to = %next_origin, status, "following redirect");
                    redirect_chain.push(format!("{next_origin}{}", next_url.path_and_query));

                    let next_request = Request {
                        method: next_method,
                        url: format!("{next_origin}{}", next_url.path_and_query),
                        headers: next_headers,
                        body: None,
                        timeout: request.timeout,
                    };
                    return run_attempt(&next_request, config, pool, tls, hops_so_far + 1, redirect_chain).await;
                }
            }
        }

        Ok(Response {
            status,
            reason: raw.head.reason,
            headers: raw.head.headers,
            body: raw.body,
            redirects: redirect_chain,
        })
    })
}

/// Execute `request` to completion: rate-limit admission, the redirect-
/// inclusive attempt, and the retry loop wrapping the whole thing. Every
/// retry acquires a fresh connection; none of a failed attempt's state is
/// reused.
pub async fn execute(
    request: &Request,
    config: &ClientConfig,
    pool: &ConnectionPool,
    tls: Option<&TlsConnector>,
    rate_limiter: Option<&RateLimiter>,
) -> Result<Response, HttpError> {
    let mut retry_state = RetryState::new(config.retry_config());

    loop {
        if let Some(limiter) = rate_limiter {
            limiter.acquire().await;
        }

        match run_attempt(request, config, pool, tls, 0, Vec::new()).await {
            Ok(response) => {
                if retry_state.should_retry(AttemptOutcome::Status(response.status)) {
                    let delay = retry_state.record_retry();
                    debug!(attempt = retry_state.attempt(), status = response.status, ?delay, "retrying after 5xx");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                if retry_state.should_retry(AttemptOutcome::Error(&err)) {
                    let delay = retry_state.record_retry();
                    debug!(attempt = retry_state.attempt(), error = %err, ?delay, "retrying after error");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                if err.is_connection_error() || err.is_timeout() {
                    warn!(error = %err, "request failed without retrying");
                }
                return Err(err);
            }
        }
    }
}

/// Stream Server-Sent Events from `request`, invoking `on_event` for each
/// dispatched event. Connections used for SSE are never returned to the
/// idle pool (a long-lived stream would otherwise pin it out of rotation
/// for everyone else). Retries do not apply once streaming has started;
/// reconnection is a protocol-level concern left to the caller.
pub async fn stream_events<F>(request: &Request, config: &ClientConfig, tls: Option<&TlsConnector>, mut on_event: F) -> Result<(), HttpError>
where
    F: FnMut(SseEvent) -> ControlFlow<()>,
{
    let url = UrlInfo::parse(&request.url)?;
    let origin = url.origin();
    let overall_deadline = attempt_deadline(request, config);

    let mut conn = connect_origin(&origin, config, tls).await?;
    let write_buf = codec::serialize_request(request, &url, &config.user_agent, config.enable_compression);
    conn.write_all(&write_buf, overall_deadline).await?;

    let deadlines = Deadlines::new(overall_deadline, config.read_timeout);
    let (head, mut stream) = codec::read_response_head(&mut conn, config.max_header_bytes, &deadlines).await?;

    if !(200..300).contains(&head.status) {
        let status = head.status;
        drop(stream);
        conn.close();
        return Err(HttpError::protocol(format!("SSE request received non-2xx status {status}")));
    }

    let mut parser = SseParser::new();
    let mut stopped = false;
    'read: loop {
        match stream.next_chunk(config.max_body_bytes, &deadlines).await? {
            Some(bytes) => {
                for event in parser.feed(&bytes) {
                    if on_event(event).is_break() {
                        stopped = true;
                        break 'read;
                    }
                }
            }
            None => break,
        }
    }
    drop(stream);

    if !stopped {
        if let Some(event) = parser.finish() {
            let _ = on_event(event);
        }
    }
    conn.close();
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn spawn_server(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response).await;
            }
        });
        format!("http://{addr}")
    }

    fn test_config() -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(2),
            enable_retry: false,
            ..ClientConfig::for_testing()
        }
    }

    #[tokio::test]
    async fn executes_a_simple_get() {
        let base = spawn_server(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi").await;
        let pool = ConnectionPool::new(PoolConfig::default());
        let config = test_config();
        let request = Request::new(Method::Get, format!("{base}/x"));

        let response = execute(&request, &config, &pool, None, None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_ref(), b"hi");
        assert!(response.redirects.is_empty());
    }

    #[tokio::test]
    async fn follows_redirect_and_records_chain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut n = 0;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                n += 1;
                if n == 1 {
                    let _ = stream
                        .write_all(b"HTTP/1.1 301 Moved Permanently\r\nLocation: /next\r\nContent-Length: 0\r\n\r\n")
                        .await;
                } else {
                    let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
                }
            }
        });

        let pool = ConnectionPool::new(PoolConfig::default());
        let config = test_config();
        let request = Request::new(Method::Get, format!("http://{addr}/start"));

        let response = execute(&request, &config, &pool, None, None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.redirects, vec![format!("http://{addr}/next")]);
    }

    #[tokio::test]
    async fn redirect_limit_is_enforced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\n\r\n")
                    .await;
            }
        });

        let pool = ConnectionPool::new(PoolConfig::default());
        let config = ClientConfig {
            max_redirects: 2,
            ..test_config()
        };
        let request = Request::new(Method::Get, format!("http://{addr}/start"));

        let err = execute(&request, &config, &pool, None, None).await.unwrap_err();
        assert!(matches!(err, HttpError::RedirectLimit { limit: 2 }));
    }

    #[tokio::test]
    async fn cross_origin_redirect_strips_sensitive_headers() {
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second_addr = second.local_addr().unwrap();
        let seen_auth = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_auth2 = seen_auth.clone();
        tokio::spawn(async move {
            let (mut stream, _) = second.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let text = String::from_utf8_lossy(&buf[..n]);
            *seen_auth2.lock().unwrap() = Some(text.to_lowercase().contains("authorization"));
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;
        });

        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let first_addr = first.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = first.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let body = format!("HTTP/1.1 301 Moved Permanently\r\nLocation: http://{second_addr}/next\r\nContent-Length: 0\r\n\r\n");
            let _ = stream.write_all(body.as_bytes()).await;
        });

        let pool = ConnectionPool::new(PoolConfig::default());
        let config = test_config();
        let mut request = Request::new(Method::Get, format!("http://{first_addr}/start"));
        request.headers.append("Authorization", "Bearer secret");

        let response = execute(&request, &config, &pool, None, None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(*seen_auth.lock().unwrap(), Some(false));
    }

    fn chunked_encode(body: &[u8]) -> Vec<u8> {
        let mut out = format!("{:x}\r\n", body.len()).into_bytes();
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n0\r\n\r\n");
        out
    }

    #[tokio::test]
    async fn stream_events_dispatches_and_honors_stop() {
        let event_body = b"data: one\n\ndata: two\n\n";
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        response.extend_from_slice(&chunked_encode(event_body));
        let response: &'static [u8] = Box::leak(response.into_boxed_slice());

        let base = spawn_server(response).await;
        let config = test_config();
        let request = Request::new(Method::Get, format!("{base}/events"));

        let mut events = Vec::new();
        stream_events(&request, &config, None, |event| {
            events.push(event.data.clone());
            ControlFlow::Continue(())
        })
        .await
        .unwrap();

        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
    }
}
