//! Keyed connection pool
//!
//! Connections are cached per (scheme, authority, proxy, TLS identity).
//! HTTP/1.1 handles are exclusive: checked out, used for one exchange and
//! returned when the caller releases them cleanly. HTTP/2 handles are
//! cloned from a shared sender so concurrent requests multiplex on one
//! connection. Per-key capacity is enforced by a fair semaphore; waiting
//! past the request deadline is a pool timeout.

use crate::connection::{Connection, Connector};
use crate::proxy::ProxyConfig;
use crate::{OutboundBody, TransportConfig};
use http::Request;
use httpr_errors::{Error, Result};
use hyper::body::Incoming;
use hyper::client::conn::http2;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Identity of a reusable connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    /// `http` or `https`
    pub scheme: String,
    /// Lowercased target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Proxy identity, when dialing through one
    pub proxy_id: Option<String>,
    /// TLS configuration fingerprint; zero for cleartext
    pub tls_fingerprint: u64,
}

struct PoolState {
    idle: HashMap<PoolKey, Vec<Connection>>,
    shared_h2: HashMap<PoolKey, http2::SendRequest<OutboundBody>>,
    semaphores: HashMap<PoolKey, Arc<Semaphore>>,
}

struct PoolInner {
    config: TransportConfig,
    state: Mutex<PoolState>,
}

/// Connection manager for one client
pub struct Transport {
    inner: Arc<PoolInner>,
    connector: Connector,
    proxy_id: Option<String>,
    tls_fingerprint: u64,
}

impl Transport {
    /// Build a transport from the client's TLS configuration and proxy
    pub fn new(
        config: TransportConfig,
        tls: Arc<rustls::ClientConfig>,
        tls_fingerprint: u64,
        proxy: Option<ProxyConfig>,
    ) -> Self {
        let proxy_id = proxy.as_ref().map(|proxy| proxy.id());
        let http2_only = config.http2_only;
        Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle: HashMap::new(),
                    shared_h2: HashMap::new(),
                    semaphores: HashMap::new(),
                }),
            }),
            connector: Connector {
                tls,
                proxy,
                http2_only,
            },
            proxy_id,
            tls_fingerprint,
        }
    }

    fn key_for(&self, scheme: &str, host: &str, port: u16) -> PoolKey {
        PoolKey {
            scheme: scheme.to_string(),
            host: host.to_ascii_lowercase(),
            port,
            proxy_id: self.proxy_id.clone(),
            tls_fingerprint: if scheme == "https" {
                self.tls_fingerprint
            } else {
                0
            },
        }
    }

    /// Check out a connection for the given authority
    ///
    /// Reuses an idle or multiplexed connection when possible, dialing
    /// otherwise. Waiting for per-host capacity beyond the deadline is
    /// `Error::PoolTimeout`; dial time beyond it is `Error::ConnectTimeout`.
    pub async fn checkout(
        &self,
        scheme: &str,
        host: &str,
        port: u16,
        deadline: Instant,
    ) -> Result<PooledConnection> {
        let key = self.key_for(scheme, host, port);
        let semaphore = self.semaphore_for(&key);

        let remaining = deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
            .ok_or(Error::PoolTimeout(std::time::Duration::ZERO))?;
        let permit = tokio::time::timeout(remaining, semaphore.acquire_owned())
            .await
            .map_err(|_| Error::PoolTimeout(remaining))?
            .map_err(|_| Error::Close("connection pool shut down".to_string()))?;

        // Multiplex onto a live HTTP/2 connection when one exists
        if let Some(sender) = self.live_h2_sender(&key) {
            tracing::trace!(?key, "reusing multiplexed HTTP/2 connection");
            let conn = Connection::from_h2_clone(sender, None);
            return Ok(PooledConnection::new(conn, key, Arc::clone(&self.inner), permit));
        }

        // Then a fresh-enough idle HTTP/1.1 handle
        if let Some(mut conn) = self.pop_idle(&key) {
            tracing::trace!(?key, "reusing idle connection");
            conn.mark_reused();
            return Ok(PooledConnection::new(conn, key, Arc::clone(&self.inner), permit));
        }

        let conn = self
            .connector
            .establish(scheme, host, port, deadline)
            .await?;
        if let Some(sender) = conn.h2_sender() {
            let mut state = self.lock_state();
            state.shared_h2.insert(key.clone(), sender);
        }
        Ok(PooledConnection::new(conn, key, Arc::clone(&self.inner), permit))
    }

    fn semaphore_for(&self, key: &PoolKey) -> Arc<Semaphore> {
        let mut state = self.lock_state();
        Arc::clone(
            state
                .semaphores
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.inner.config.max_connections_per_host))),
        )
    }

    fn live_h2_sender(&self, key: &PoolKey) -> Option<http2::SendRequest<OutboundBody>> {
        let mut state = self.lock_state();
        match state.shared_h2.get(key) {
            Some(sender) if !sender.is_closed() => Some(sender.clone()),
            Some(_) => {
                state.shared_h2.remove(key);
                None
            }
            None => None,
        }
    }

    fn pop_idle(&self, key: &PoolKey) -> Option<Connection> {
        let idle_timeout = self.inner.config.idle_timeout;
        let mut state = self.lock_state();
        let conns = state.idle.get_mut(key)?;
        while let Some(conn) = conns.pop() {
            if conn.is_closed() || conn.idle_since().elapsed() >= idle_timeout {
                tracing::trace!(?key, "discarding stale idle connection");
                continue;
            }
            return Some(conn);
        }
        None
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.inner.state.lock().expect("pool state lock poisoned")
    }

    /// Number of idle HTTP/1.1 connections currently cached
    pub fn idle_count(&self) -> usize {
        self.lock_state().idle.values().map(Vec::len).sum()
    }
}

/// A checked-out connection with return-on-drop semantics
///
/// Dropping after [`PooledConnection::release`] returns the handle to the
/// idle pool; dropping without releasing (error, cancellation, abandoned
/// stream) discards it so a broken connection is never reused.
pub struct PooledConnection {
    conn: Option<Connection>,
    key: PoolKey,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
    clean: bool,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("key", &self.key)
            .field("clean", &self.clean)
            .finish()
    }
}

impl PooledConnection {
    fn new(
        conn: Connection,
        key: PoolKey,
        pool: Arc<PoolInner>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            key,
            pool,
            _permit: permit,
            clean: false,
        }
    }

    /// Whether this handle was reused rather than freshly dialed
    pub fn is_reused(&self) -> bool {
        self.conn.as_ref().map(Connection::is_reused).unwrap_or(false)
    }

    /// Whether the underlying connection is HTTP/2
    pub fn is_http2(&self) -> bool {
        self.conn.as_ref().map(Connection::is_http2).unwrap_or(false)
    }

    /// Dispatch one request
    pub async fn send_request(
        &mut self,
        request: Request<OutboundBody>,
    ) -> Result<hyper::Response<Incoming>> {
        self.clean = false;
        match self.conn.as_mut() {
            Some(conn) => conn.send_request(request).await,
            None => Err(Error::Close("connection already returned".to_string())),
        }
    }

    /// Declare the exchange complete; the connection may be reused
    pub fn release(&mut self) {
        self.clean = true;
    }

    /// Declare the connection unusable; it will be discarded on drop
    pub fn mark_broken(&mut self) {
        self.clean = false;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        if conn.is_http2() {
            // The shared sender already lives in the pool; a failed exchange
            // evicts it so the next checkout dials fresh
            if !self.clean {
                let mut state = self.pool.state.lock().expect("pool state lock poisoned");
                state.shared_h2.remove(&self.key);
            }
            return;
        }

        if !self.clean || conn.is_closed() {
            tracing::trace!(key = ?self.key, "discarding connection");
            return;
        }

        conn.touch();
        let mut state = self.pool.state.lock().expect("pool state lock poisoned");
        let idle = state.idle.entry(self.key.clone()).or_default();
        if idle.len() < self.pool.config.max_idle_per_host {
            idle.push(conn);
        }
    }
}
