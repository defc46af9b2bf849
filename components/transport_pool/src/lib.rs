//! transport_pool component
//!
//! Connection-pooled HTTP/1.1 and HTTP/2 transport over TCP, TLS and
//! optional proxies. The pool caches connections per
//! (scheme, authority, proxy, TLS identity): HTTP/1.1 handles carry one
//! request at a time and return to an idle list, HTTP/2 handles multiplex
//! through a shared sender. Capacity per peer is bounded by a fair waiter
//! queue, idle connections expire, and a reuse failure is retried once on a
//! fresh connection for idempotent methods only.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod connection;
mod pool;
pub mod proxy;
mod stream;

pub use connection::{map_hyper_error, Connection};
pub use pool::{PoolKey, PooledConnection, Transport};
pub use proxy::{ProxyAuth, ProxyConfig};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use std::pin::Pin;
use std::time::Duration;

/// Request body type handed to the wire
pub type OutboundBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Pool sizing and reuse policy
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Concurrent checkouts allowed per pool key
    pub max_connections_per_host: usize,
    /// Idle HTTP/1.1 handles cached per pool key
    pub max_idle_per_host: usize,
    /// Age past which an idle connection is discarded at checkout
    pub idle_timeout: Duration,
    /// Force HTTP/2 even without ALPN (`h2` prior knowledge on cleartext)
    pub http2_only: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: 6,
            max_idle_per_host: 6,
            idle_timeout: Duration::from_secs(90),
            http2_only: false,
        }
    }
}

/// An empty request body
pub fn empty_body() -> OutboundBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// A fully materialised request body, sent with `Content-Length`
pub fn full_body(bytes: Bytes) -> OutboundBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

/// A streamed request body, sent with chunked transfer encoding
pub fn stream_body(
    stream: Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>,
) -> OutboundBody {
    StreamBody::new(stream.map(|chunk| chunk.map(hyper::body::Frame::data))).boxed_unsync()
}

/// Whether a failed send may be transparently retried on a fresh connection
///
/// Only a reused connection qualifies (the failure is then most likely a
/// stale keep-alive), and only for idempotent methods.
pub fn retryable(reused: bool, idempotent: bool) -> bool {
    reused && idempotent
}
