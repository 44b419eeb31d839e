//! Per-origin bounded connection pool (component C6).
//!
//! Guards: `idle.len() + checked_out <= max_per_origin` for every origin,
//! and a nonempty waiter queue implies the idle list is empty and
//! `checked_out == max_per_origin`. The pool mutex is held only across
//! bookkeeping, never across I/O — connection construction and TLS
//! handshake happen with the mutex released.

use crate::connection::Connection;
use crate::url::Origin;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{debug, trace};

struct OriginEntry {
    idle: Vec<Connection>,
    checked_out: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl OriginEntry {
    fn new() -> Self {
        OriginEntry {
            idle: Vec::new(),
            checked_out: 0,
            waiters: VecDeque::new(),
        }
    }
}

struct State {
    entries: HashMap<Origin, OriginEntry>,
}

/// Pool-wide configuration.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_per_origin: usize,
    pub keepalive_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_per_origin: 5,
            keepalive_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared, cloneable handle to the pool.
#[derive(Clone)]
pub struct ConnectionPool {
    config: PoolConfig,
    state: Arc<Mutex<State>>,
}

/// What the caller tried after finding no immediately-usable connection.
enum AcquireStep {
    Reused(Connection),
    NeedsFresh,
    Wait(oneshot::Receiver<()>),
}

impl ConnectionPool {
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        ConnectionPool {
            config,
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
            })),
        }
    }

    /// Acquire a connection for `origin`, creating a fresh one if the pool
    /// has headroom, or suspending on a FIFO waiter otherwise.
    ///
    /// `connect_fresh` is invoked with the pool mutex released so transport
    /// setup (TCP connect, TLS handshake) never blocks bookkeeping for
    /// other origins.
    pub async fn acquire<F, Fut, E>(&self, origin: &Origin, mut connect_fresh: F) -> Result<Connection, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Connection, E>>,
    {
        loop {
            let step = {
                let mut state = self.state.lock().await;
                let entry = state.entries.entry(origin.clone()).or_insert_with(OriginEntry::new);

                let now = Instant::now();
                entry.idle.retain(|c| {
                    let keep = c.is_healthy() && !c.is_idle_expired(now, self.config.keepalive_timeout);
                    if !keep {
                        trace!(%origin, "evicting idle connection (expired or unhealthy)");
                    }
                    keep
                });

                if let Some(conn) = entry.idle.pop() {
                    entry.checked_out += 1;
                    AcquireStep::Reused(conn)
                } else if entry.checked_out < self.config.max_per_origin {
                    entry.checked_out += 1;
                    AcquireStep::NeedsFresh
                } else {
                    let (tx, rx) = oneshot::channel();
                    entry.waiters.push_back(tx);
                    AcquireStep::Wait(rx)
                }
            };

            match step {
                AcquireStep::Reused(conn) => {
                    debug!(%origin, "reused idle connection");
                    return Ok(conn);
                }
                AcquireStep::NeedsFresh => {
                    debug!(%origin, "opening fresh connection");
                    return match connect_fresh().await {
                        Ok(conn) => Ok(conn),
                        Err(e) => {
                            // Undo the reservation; we never got a connection.
                            let mut state = self.state.lock().await;
                            if let Some(entry) = state.entries.get_mut(origin) {
                                entry.checked_out = entry.checked_out.saturating_sub(1);
                                wake_one(entry);
                            }
                            Err(e)
                        }
                    };
                }
                AcquireStep::Wait(rx) => {
                    let _ = rx.await;
                    // Loop back to step 2 and try again.
                }
            }
        }
    }

    /// Release a connection previously returned by `acquire`. `reusable`
    /// should be `success && keep-alive-advertised && body-fully-consumed`
    /// as computed by the executor.
    pub async fn release(&self, origin: &Origin, mut conn: Connection, reusable: bool) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.entries.get_mut(origin) else {
            return;
        };

        entry.checked_out = entry.checked_out.saturating_sub(1);

        if reusable && conn.is_healthy() && entry.idle.len() < self.config.max_per_origin {
            conn.mark_idle();
            entry.idle.push(conn);
            debug!(%origin, "released connection to idle pool");
        } else {
            conn.close();
            debug!(%origin, "closed non-reusable connection on release");
        }

        wake_one(entry);
    }
}

fn wake_one(entry: &mut OriginEntry) {
    if let Some(tx) = entry.waiters.pop_front() {
        let _ = tx.send(());
    }
}

/// RAII guard ensuring a checked-out connection is released exactly once,
/// on every exit path including panics unwinding through it and early
/// returns via `?`. The executor calls `into_inner` to split the
/// connection out, then `finish` with whatever reusability it computed;
/// if `finish` is never called, `Drop` releases with `reusable = false`.
pub struct PooledConnection {
    pool: ConnectionPool,
    origin: Origin,
    conn: Option<Connection>,
    reusable: bool,
}

impl PooledConnection {
    pub(crate) fn new(pool: ConnectionPool, origin: Origin, conn: Connection) -> Self {
        PooledConnection {
            pool,
            origin,
            conn: Some(conn),
            reusable: false,
        }
    }

    pub fn get_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken before release")
    }

    /// Mark the connection as eligible for pooling once this guard is
    /// dropped or explicitly released.
    pub fn mark_reusable(&mut self, reusable: bool) {
        self.reusable = reusable;
    }

    /// Explicitly release back to the pool now rather than on drop.
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(&self.origin, conn, self.reusable).await;
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            // Dropped without an explicit async release (panic/cancellation
            // path): close the connection synchronously and wake a waiter
            // via a best-effort spawned task. A connection dropped here is
            // never reusable.
            conn.close();
            let pool = self.pool.clone();
            let origin = self.origin.clone();
            tokio::spawn(async move {
                pool.release(&origin, conn, false).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::Scheme;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    fn test_origin(port: u16) -> Origin {
        Origin {
            scheme: Scheme::Http,
            host: "127.0.0.1".into(),
            port,
        }
    }

    async fn spawn_echo_server() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn acquire_creates_up_to_max_per_origin_then_reuses() {
        let (listener, port) = spawn_echo_server().await;
        let accept_count = Arc::new(AtomicUsize::new(0));
        {
            let accept_count = accept_count.clone();
            tokio::spawn(async move {
                loop {
                    if listener.accept().await.is_ok() {
                        accept_count.fetch_add(1, Ordering::SeqCst);
                    } else {
                        break;
                    }
                }
            });
        }

        let pool = ConnectionPool::new(PoolConfig {
            max_per_origin: 5,
            keepalive_timeout: Duration::from_secs(30),
        });
        let origin = test_origin(port);

        // 10 sequential acquire+release cycles against the same origin.
        for _ in 0..10 {
            let conn = pool
                .acquire(&origin, || async {
                    Connection::connect(&origin, Instant::now() + Duration::from_secs(2)).await
                })
                .await
                .unwrap();
            let mut guard = PooledConnection::new(pool.clone(), origin.clone(), conn);
            guard.mark_reusable(true);
            guard.release().await;
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(accept_count.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn release_non_reusable_does_not_return_to_idle() {
        let (listener, port) = spawn_echo_server().await;
        tokio::spawn(async move {
            while listener.accept().await.is_ok() {}
        });

        let pool = ConnectionPool::new(PoolConfig::default());
        let origin = test_origin(port);

        let conn = pool
            .acquire(&origin, || async {
                Connection::connect(&origin, Instant::now() + Duration::from_secs(2)).await
            })
            .await
            .unwrap();
        let mut guard = PooledConnection::new(pool.clone(), origin.clone(), conn);
        guard.mark_reusable(false);
        guard.release().await;

        let state = pool.state.lock().await;
        let entry = state.entries.get(&origin).unwrap();
        assert_eq!(entry.idle.len(), 0);
        assert_eq!(entry.checked_out, 0);
    }
}
