//! Single-connection establishment and request dispatch
//!
//! Dials TCP (optionally through a proxy), wraps TLS when the scheme asks
//! for it, then performs the HTTP/1.1 or HTTP/2 handshake selected by ALPN.
//! The connection driver runs on a spawned task; the handle kept here is
//! the hyper send-request side.

use crate::proxy::ProxyConfig;
use crate::stream::MaybeTlsStream;
use crate::OutboundBody;
use http::header::HOST;
use http::{HeaderValue, Request};
use httpr_errors::{Error, Result};
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Protocol handle side of an established connection
enum Sender {
    Http1(http1::SendRequest<OutboundBody>),
    Http2(http2::SendRequest<OutboundBody>),
}

/// An established HTTP connection ready to carry requests
pub struct Connection {
    sender: Sender,
    /// Plain-http target behind an HTTP proxy: requests keep the absolute
    /// URI and carry Proxy-Authorization
    absolute_form: bool,
    proxy_authorization: Option<HeaderValue>,
    reused: bool,
    idle_since: Instant,
}

impl Connection {
    /// Whether this connection multiplexes (HTTP/2)
    pub fn is_http2(&self) -> bool {
        matches!(self.sender, Sender::Http2(_))
    }

    /// Whether the peer or driver has shut the connection down
    pub fn is_closed(&self) -> bool {
        match &self.sender {
            Sender::Http1(sender) => sender.is_closed(),
            Sender::Http2(sender) => sender.is_closed(),
        }
    }

    /// True when this handle came from the idle pool rather than a fresh dial
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub(crate) fn mark_reused(&mut self) {
        self.reused = true;
        self.idle_since = Instant::now();
    }

    pub(crate) fn idle_since(&self) -> Instant {
        self.idle_since
    }

    pub(crate) fn touch(&mut self) {
        self.idle_since = Instant::now();
    }

    pub(crate) fn from_h2_clone(
        sender: http2::SendRequest<OutboundBody>,
        proxy_authorization: Option<HeaderValue>,
    ) -> Self {
        Self {
            sender: Sender::Http2(sender),
            absolute_form: false,
            proxy_authorization,
            reused: true,
            idle_since: Instant::now(),
        }
    }

    pub(crate) fn h2_sender(&self) -> Option<http2::SendRequest<OutboundBody>> {
        match &self.sender {
            Sender::Http2(sender) => Some(sender.clone()),
            Sender::Http1(_) => None,
        }
    }

    /// Send a request with an absolute URI; the connection adapts it to the
    /// wire form its protocol needs
    pub async fn send_request(
        &mut self,
        mut request: Request<OutboundBody>,
    ) -> Result<hyper::Response<Incoming>> {
        match &mut self.sender {
            Sender::Http1(sender) => {
                prepare_http1_request(&mut request, self.absolute_form)?;
                if self.absolute_form {
                    if let Some(value) = &self.proxy_authorization {
                        request
                            .headers_mut()
                            .insert("proxy-authorization", value.clone());
                    }
                }
                sender
                    .ready()
                    .await
                    .map_err(|e| map_hyper_error("connection not ready", e))?;
                sender
                    .send_request(request)
                    .await
                    .map_err(|e| map_hyper_error("request failed", e))
            }
            Sender::Http2(sender) => {
                // HTTP/2 derives :scheme/:authority from the absolute URI
                request.headers_mut().remove(HOST);
                sender
                    .ready()
                    .await
                    .map_err(|e| map_hyper_error("connection not ready", e))?;
                sender
                    .send_request(request)
                    .await
                    .map_err(|e| map_hyper_error("request failed", e))
            }
        }
    }
}

/// HTTP/1.1 wants origin-form plus a Host header, except through a plain
/// HTTP proxy where the absolute form is kept
fn prepare_http1_request(request: &mut Request<OutboundBody>, absolute_form: bool) -> Result<()> {
    let authority = request
        .uri()
        .authority()
        .map(|authority| authority.to_string());
    if let Some(authority) = authority {
        if !request.headers().contains_key(HOST) {
            let value = HeaderValue::from_str(&authority)
                .map_err(|e| Error::LocalProtocol(format!("invalid Host value: {}", e)))?;
            request.headers_mut().insert(HOST, value);
        }
    }

    if !absolute_form {
        let origin = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .parse::<http::Uri>()
            .map_err(|e| Error::LocalProtocol(format!("invalid request target: {}", e)))?;
        *request.uri_mut() = origin;
    }
    Ok(())
}

/// Classify a hyper error into the client taxonomy
pub fn map_hyper_error(context: &str, err: hyper::Error) -> Error {
    if err.is_parse() || err.is_incomplete_message() {
        Error::RemoteProtocol(format!("{}: {}", context, err))
    } else if err.is_user() {
        Error::LocalProtocol(format!("{}: {}", context, err))
    } else if err.is_body_write_aborted() {
        Error::Write(format!("{}: {}", context, err))
    } else if err.is_closed() {
        Error::Close(format!("{}: {}", context, err))
    } else {
        Error::Read(format!("{}: {}", context, err))
    }
}

/// How a new connection should be dialed
pub(crate) struct Connector {
    pub tls: Arc<rustls::ClientConfig>,
    pub proxy: Option<ProxyConfig>,
    pub http2_only: bool,
}

impl Connector {
    /// Dial, wrap and handshake a fresh connection within the deadline
    pub async fn establish(
        &self,
        scheme: &str,
        host: &str,
        port: u16,
        deadline: Instant,
    ) -> Result<Connection> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
            .ok_or(Error::ConnectTimeout(Duration::ZERO))?;

        tokio::time::timeout(remaining, self.establish_inner(scheme, host, port))
            .await
            .map_err(|_| Error::ConnectTimeout(remaining))?
    }

    async fn establish_inner(&self, scheme: &str, host: &str, port: u16) -> Result<Connection> {
        let (tcp, absolute_form) = self.open_tcp(scheme, host, port).await?;

        let stream = if scheme == "https" {
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|_| Error::InvalidUrl(format!("invalid TLS server name {:?}", host)))?;
            let tls = TlsConnector::from(Arc::clone(&self.tls))
                .connect(server_name, tcp)
                .await
                .map_err(|e| Error::Connect(format!("TLS handshake with {} failed: {}", host, e)))?;
            MaybeTlsStream::Tls(Box::new(tls))
        } else {
            MaybeTlsStream::Plain(tcp)
        };

        let use_http2 = self.http2_only || stream.alpn_protocol() == Some(b"h2".as_slice());
        let proxy_authorization = if absolute_form {
            self.proxy
                .as_ref()
                .and_then(|proxy| proxy.authorization_header())
                .map(|value| {
                    HeaderValue::from_str(&value)
                        .map_err(|e| Error::Proxy(format!("invalid proxy credentials: {}", e)))
                })
                .transpose()?
        } else {
            None
        };

        let io = TokioIo::new(stream);
        let sender = if use_http2 {
            let (sender, driver) = http2::handshake(TokioExecutor::new(), io)
                .await
                .map_err(|e| Error::Connect(format!("HTTP/2 handshake failed: {}", e)))?;
            tokio::spawn(async move {
                if let Err(err) = driver.await {
                    tracing::debug!(%err, "HTTP/2 connection task ended");
                }
            });
            tracing::debug!(host, port, "HTTP/2 connection established");
            Sender::Http2(sender)
        } else {
            let (sender, driver) = http1::handshake(io)
                .await
                .map_err(|e| Error::Connect(format!("HTTP/1.1 handshake failed: {}", e)))?;
            tokio::spawn(async move {
                if let Err(err) = driver.await {
                    tracing::debug!(%err, "HTTP/1.1 connection task ended");
                }
            });
            tracing::debug!(host, port, "HTTP/1.1 connection established");
            Sender::Http1(sender)
        };

        Ok(Connection {
            sender,
            absolute_form,
            proxy_authorization,
            reused: false,
            idle_since: Instant::now(),
        })
    }

    /// TCP leg: direct, CONNECT tunnel, SOCKS5, or plain proxy passthrough
    async fn open_tcp(&self, scheme: &str, host: &str, port: u16) -> Result<(TcpStream, bool)> {
        match &self.proxy {
            None => {
                let stream = TcpStream::connect((host, port)).await.map_err(|e| {
                    Error::Connect(format!("failed to connect to {}:{}: {}", host, port, e))
                })?;
                Ok((stream, false))
            }
            Some(proxy @ ProxyConfig::Http { .. }) if scheme == "http" => {
                // No tunnel for cleartext targets; requests go absolute-form
                Ok((proxy.open().await?, true))
            }
            Some(proxy) => Ok((proxy.tunnel(host, port).await?, false)),
        }
    }
}
