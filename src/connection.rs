//! A single pooled transport endpoint, plaintext or TLS (component C5).

use crate::error::{HttpError, TimeoutPhase};
use crate::url::Origin;
use rustls_pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Either side of the plaintext/TLS split, behind one read/write surface.
/// Both variants are `Unpin` (`TcpStream` and `TlsStream<TcpStream>` both
/// are), so the enum needs no pin-projection to implement `AsyncRead`/
/// `AsyncWrite`.
enum Io {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Io {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Io::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Io::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Io {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Io::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Io::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Io::Plain(s) => Pin::new(s).poll_flush(cx),
            Io::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Io::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Io::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// One checked-out (or idle, while owned by the pool) transport endpoint.
pub struct Connection {
    io: Option<Io>,
    pub(crate) origin: Origin,
    pub(crate) last_used: Instant,
    pub(crate) healthy: bool,
}

impl Connection {
    /// Open a TCP connection to `origin`, under `deadline`.
    pub async fn connect(origin: &Origin, deadline: Instant) -> Result<Connection, HttpError> {
        let addr = format!("{}:{}", origin.host, origin.port);
        let fut = TcpStream::connect(&addr);
        let stream = with_deadline(fut, deadline, TimeoutPhase::Connect).await?.map_err(|e| {
            HttpError::ConnectError {
                origin: origin.to_string(),
                source: Box::new(e),
            }
        })?;
        let _ = stream.set_nodelay(true);

        Ok(Connection {
            io: Some(Io::Plain(stream)),
            origin: origin.clone(),
            last_used: Instant::now(),
            healthy: true,
        })
    }

    /// Upgrade a freshly connected plaintext socket to TLS, SNI set to
    /// `origin.host`. Shares the connect-phase deadline.
    pub async fn handshake(mut self, connector: &TlsConnector, deadline: Instant) -> Result<Connection, HttpError> {
        let Some(Io::Plain(stream)) = self.io.take() else {
            return Err(HttpError::protocol("handshake called on a non-plain or already-consumed connection"));
        };

        let server_name = ServerName::try_from(self.origin.host.clone()).map_err(|e| HttpError::TlsError {
            host: self.origin.host.clone(),
            source: Box::new(e),
        })?;

        let fut = connector.connect(server_name, stream);
        let tls = with_deadline(fut, deadline, TimeoutPhase::TlsHandshake)
            .await?
            .map_err(|e| HttpError::TlsError {
                host: self.origin.host.clone(),
                source: Box::new(e),
            })?;

        self.io = Some(Io::Tls(Box::new(tls)));
        Ok(self)
    }

    /// Write the full buffer, failing with `Timeout` if `deadline` passes
    /// first.
    pub async fn write_all(&mut self, buf: &[u8], deadline: Instant) -> Result<(), HttpError> {
        use tokio::io::AsyncWriteExt;
        let io = self.io.as_mut().expect("connection io missing");
        let result = with_deadline(io.write_all(buf), deadline, TimeoutPhase::Write).await?;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.healthy = false;
                Err(HttpError::ConnectError {
                    origin: self.origin.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Read whatever is available into `buf`, returning the number of
    /// bytes read (0 at EOF). Bounded by `deadline` as an inactivity
    /// timer: the caller is expected to call this repeatedly and pass a
    /// fresh deadline each time read progress occurs.
    pub async fn read_some(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize, HttpError> {
        use tokio::io::AsyncReadExt;
        let io = self.io.as_mut().expect("connection io missing");
        let result = with_deadline(io.read(buf), deadline, TimeoutPhase::Read).await?;
        match result {
            Ok(n) => {
                if n == 0 {
                    self.healthy = false;
                }
                Ok(n)
            }
            Err(e) => {
                self.healthy = false;
                Err(HttpError::ConnectError {
                    origin: self.origin.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    pub fn close(&mut self) {
        self.io = None;
        self.healthy = false;
    }

    #[must_use]
    pub fn is_idle_expired(&self, now: Instant, keepalive_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_used) >= keepalive_timeout
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy && self.io.is_some()
    }

    pub(crate) fn mark_idle(&mut self) {
        self.last_used = Instant::now();
    }
}

/// Race `fut` against `deadline`, translating expiry into `HttpError::Timeout`
/// tagged with `phase`. On success returns the inner future's own result
/// (I/O errors are not wrapped here; callers attach origin/host context).
async fn with_deadline<F, T>(fut: F, deadline: Instant, phase: TimeoutPhase) -> Result<T, HttpError>
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(v) => Ok(v),
        Err(_) => Err(HttpError::Timeout {
            phase,
            duration: deadline.saturating_duration_since(Instant::now()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_and_close_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let origin = Origin {
            scheme: crate::url::Scheme::Http,
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();
        assert!(conn.is_healthy());
        conn.close();
        assert!(!conn.is_healthy());
    }

    #[tokio::test]
    async fn connect_times_out_against_unroutable_address() {
        let origin = Origin {
            scheme: crate::url::Scheme::Http,
            host: "10.255.255.1".to_string(),
            port: 81,
        };
        let deadline = Instant::now() + Duration::from_millis(50);
        let result = Connection::connect(&origin, deadline).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn read_some_reports_eof_and_marks_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let origin = Origin {
            scheme: crate::url::Scheme::Http,
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut conn = Connection::connect(&origin, deadline).await.unwrap();

        let mut buf = [0u8; 16];
        // Give the peer a moment to close.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let n = conn.read_some(&mut buf, Instant::now() + Duration::from_secs(1)).await.unwrap();
        assert_eq!(n, 0);
        assert!(!conn.is_healthy());
    }

    #[test]
    fn idle_expiry_threshold() {
        let origin = Origin {
            scheme: crate::url::Scheme::Http,
            host: "x".into(),
            port: 80,
        };
        let conn = Connection {
            io: None,
            origin,
            last_used: Instant::now() - Duration::from_secs(60),
            healthy: true,
        };
        assert!(conn.is_idle_expired(Instant::now(), Duration::from_secs(30)));
        assert!(!conn.is_idle_expired(Instant::now(), Duration::from_secs(120)));
    }
}
