//! Request execution
//!
//! The orchestrator: resolves each hop against the transport pool, drives
//! redirects with cookie, credential and referer policy, maps every stage
//! timeout to its taxonomy variant, and hands back a buffered or streaming
//! response.

use crate::config::ClientConfig;
use crate::plan::RequestPlan;
use crate::response::{Response, StreamingResponse};
use http::header::{
    HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, COOKIE,
    LOCATION, REFERER, SET_COOKIE, USER_AGENT,
};
use httpr_codec::{encode_request_body, EncodedBody, Payload};
use httpr_cookies::CookieStore;
use httpr_errors::{Error, Result};
use httpr_transport::{
    empty_body, full_body, stream_body, OutboundBody, PooledConnection, ProxyConfig, Transport,
    TransportConfig,
};
use httpr_types::{Body, HeaderMap, Method};
use hyper::body::Incoming;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!("httpr/", env!("CARGO_PKG_VERSION"));

/// Redirect statuses the executor understands
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// The per-client execution engine
///
/// Owns the connection pool and the cookie jar; transport-level settings
/// (TLS, proxy, HTTP/2) are fixed when the engine is built.
pub struct Executor {
    transport: Transport,
    jar: Option<Arc<CookieStore>>,
    referer: bool,
}

impl Executor {
    /// Build the engine for a client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tls_settings = config.tls_settings();
        let tls = tls_settings.build()?;
        let proxy = config
            .proxy
            .as_deref()
            .map(ProxyConfig::parse)
            .transpose()?;
        let transport = Transport::new(
            TransportConfig {
                http2_only: config.http2_only,
                ..TransportConfig::default()
            },
            tls,
            tls_settings.fingerprint(),
            proxy,
        );
        let jar = config.cookie_store.then(|| Arc::new(CookieStore::new()));
        Ok(Self {
            transport,
            jar,
            referer: config.referer,
        })
    }

    /// The cookie jar, when the store is enabled
    pub fn cookie_store(&self) -> Option<Arc<CookieStore>> {
        self.jar.clone()
    }

    /// Execute a plan and buffer the whole response body
    pub async fn execute(&self, plan: RequestPlan) -> Result<Response> {
        let mut streaming = self.execute_streaming(plan).await?;
        let content = streaming.read().await?;
        Ok(streaming.into_buffered(content))
    }

    /// Execute a plan, returning after the response head
    pub async fn execute_streaming(&self, plan: RequestPlan) -> Result<StreamingResponse> {
        let deadline = Instant::now() + plan.timeout;
        let mut url = plan.url;
        let mut method = plan.method;
        let mut headers = plan.headers;
        let mut body = plan.body;
        let mut auth_header = plan.auth_header;
        let mut request_cookies = plan.request_cookies;
        let mut referer: Option<String> = None;
        let mut history: Vec<Url> = Vec::new();
        let mut remaining_redirects = plan.max_redirects;

        loop {
            let (response, conn) = self
                .send_hop(
                    method,
                    &url,
                    &headers,
                    auth_header.as_deref(),
                    &request_cookies,
                    referer.as_deref(),
                    body.as_ref(),
                    deadline,
                    plan.timeout,
                )
                .await?;

            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            if plan.follow_redirects && is_redirect(status) {
                if let Some(location) = location {
                    self.update_jar(&url, response.headers());
                    if remaining_redirects == 0 {
                        return Err(Error::TooManyRedirects(plan.max_redirects));
                    }
                    remaining_redirects -= 1;

                    let next = url.join(&location).map_err(|e| {
                        Error::InvalidUrl(format!("redirect target {:?}: {}", location, e))
                    })?;

                    drain_hop(response, conn, plan.timeout).await;

                    // 303 always rewrites to GET; 301/302 rewrite POST to
                    // GET for de-facto compatibility
                    if status == 303 || (matches!(status, 301 | 302) && method == Method::Post) {
                        if method != Method::Head {
                            method = Method::Get;
                        }
                        body = None;
                        headers.retain(|(name, _)| name != "content-type" && name != "content-length");
                    } else if matches!(status, 307 | 308) {
                        if let Some(body) = &body {
                            if !body.is_replayable() {
                                return Err(Error::LocalProtocol(
                                    "cannot follow redirect: streamed request body is not replayable"
                                        .to_string(),
                                ));
                            }
                        }
                    }

                    if next.host_str() != url.host_str() {
                        auth_header = None;
                        headers.retain(|(name, _)| name != "authorization");
                    }
                    if !same_origin(&next, &url) {
                        request_cookies.clear();
                    }
                    if self.referer && !(url.scheme() == "https" && next.scheme() == "http") {
                        referer = Some(referer_value(&url));
                    }

                    tracing::debug!(from = %url, to = %next, status, "following redirect");
                    history.push(url);
                    url = next;
                    continue;
                }
            }

            self.update_jar(&url, response.headers());
            let header_view = response_header_view(response.headers());
            let reason = response
                .status()
                .canonical_reason()
                .unwrap_or("")
                .to_string();
            let incoming = response.into_body();
            return Ok(StreamingResponse::new(
                status,
                reason,
                header_view,
                url,
                history,
                plan.timeout,
                incoming,
                conn,
            ));
        }
    }

    /// One request/response exchange, with the single transparent retry
    /// allowed for idempotent methods on reused connections
    #[allow(clippy::too_many_arguments)]
    async fn send_hop(
        &self,
        method: Method,
        url: &Url,
        headers: &[(String, String)],
        auth_header: Option<&str>,
        request_cookies: &[(String, String)],
        referer: Option<&str>,
        body: Option<&Body>,
        deadline: Instant,
        total_timeout: Duration,
    ) -> Result<(hyper::Response<Incoming>, PooledConnection)> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidUrl(format!("{}: cannot determine port", url)))?;

        let accept = headers
            .iter()
            .find(|(name, _)| name == "accept")
            .map(|(_, value)| value.clone());

        let mut attempted_retry = false;
        loop {
            let mut conn = self
                .transport
                .checkout(url.scheme(), host, port, deadline)
                .await?;
            let reused = conn.is_reused();

            // Encoded fresh on every attempt; a multipart stream is
            // consumed by the send it feeds
            let encoded = match body {
                Some(body) => Some(encode_request_body(body, accept.as_deref()).await?),
                None => None,
            };
            let streamed_upload = matches!(
                encoded,
                Some(EncodedBody {
                    payload: Payload::Stream(_),
                    ..
                })
            );
            let request = self.build_request(
                method,
                url,
                headers,
                auth_header,
                request_cookies,
                referer,
                encoded,
            )?;

            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|left| !left.is_zero())
                .ok_or_else(|| stage_timeout(streamed_upload, total_timeout))?;

            match tokio::time::timeout(remaining, conn.send_request(request)).await {
                Err(_) => {
                    conn.mark_broken();
                    return Err(stage_timeout(streamed_upload, total_timeout));
                }
                Ok(Ok(response)) => return Ok((response, conn)),
                Ok(Err(err)) => {
                    conn.mark_broken();
                    let may_retry = !attempted_retry
                        && httpr_transport::retryable(reused, method.is_idempotent())
                        && err.is_network_error();
                    if may_retry {
                        tracing::debug!(%err, %url, "reused connection failed, retrying once");
                        attempted_retry = true;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Assemble the wire request: caller headers, then the computed
    /// credential, cookie, referer and negotiation headers
    fn build_request(
        &self,
        method: Method,
        url: &Url,
        headers: &[(String, String)],
        auth_header: Option<&str>,
        request_cookies: &[(String, String)],
        referer: Option<&str>,
        encoded: Option<EncodedBody>,
    ) -> Result<http::Request<OutboundBody>> {
        let (content_type, payload) = match encoded {
            Some(EncodedBody {
                content_type,
                payload,
            }) => match payload {
                Payload::Full(bytes) => (content_type, full_body(bytes)),
                Payload::Stream(stream) => (content_type, stream_body(stream)),
            },
            None => (None, empty_body()),
        };

        let mut request = http::Request::builder()
            .method(method.to_http())
            .uri(url.as_str())
            .body(payload)
            .map_err(|e| Error::LocalProtocol(format!("cannot build request: {}", e)))?;
        let wire = request.headers_mut();

        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    wire.insert(name, value);
                }
                _ => {
                    tracing::warn!(%name, "skipping invalid header");
                }
            }
        }

        if let Some(auth) = auth_header {
            if !wire.contains_key(AUTHORIZATION) {
                if let Ok(value) = HeaderValue::from_str(auth) {
                    wire.insert(AUTHORIZATION, value);
                } else {
                    tracing::warn!("skipping invalid Authorization value");
                }
            }
        }

        let cookie_header = match &self.jar {
            Some(jar) => jar.cookie_header(url, request_cookies),
            None => manual_cookie_header(request_cookies),
        };
        if let Some(cookies) = cookie_header {
            match HeaderValue::from_str(&cookies) {
                Ok(value) => {
                    wire.insert(COOKIE, value);
                }
                Err(_) => tracing::warn!("skipping invalid cookie value"),
            }
        }

        if let Some(referer) = referer {
            if !wire.contains_key(REFERER) {
                if let Ok(value) = HeaderValue::from_str(referer) {
                    wire.insert(REFERER, value);
                }
            }
        }

        if let Some(content_type) = content_type {
            if !wire.contains_key(CONTENT_TYPE) {
                if let Ok(value) = HeaderValue::from_str(&content_type) {
                    wire.insert(CONTENT_TYPE, value);
                }
            }
        }

        if !wire.contains_key(USER_AGENT) {
            wire.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        if !wire.contains_key(ACCEPT) {
            wire.insert(ACCEPT, HeaderValue::from_static("*/*"));
        }
        if !wire.contains_key(ACCEPT_ENCODING) {
            wire.insert(
                ACCEPT_ENCODING,
                HeaderValue::from_static(httpr_codec::accept_encoding()),
            );
        }

        Ok(request)
    }

    fn update_jar(&self, url: &Url, headers: &http::HeaderMap) {
        if let Some(jar) = &self.jar {
            let values = headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok().map(str::to_string));
            jar.store_response_cookies(url, values);
        }
    }
}

/// `ReadTimeout` waiting for the head, `WriteTimeout` while a streamed
/// upload was still being transmitted
fn stage_timeout(streamed_upload: bool, budget: Duration) -> Error {
    if streamed_upload {
        Error::WriteTimeout(budget)
    } else {
        Error::ReadTimeout(budget)
    }
}

/// Consume a redirect hop's body so the connection can be reused
async fn drain_hop(response: hyper::Response<Incoming>, mut conn: PooledConnection, budget: Duration) {
    use http_body_util::BodyExt;
    match tokio::time::timeout(budget, response.into_body().collect()).await {
        Ok(Ok(_)) => conn.release(),
        Ok(Err(err)) => {
            tracing::debug!(%err, "failed to drain redirect body");
            conn.mark_broken();
        }
        Err(_) => conn.mark_broken(),
    }
}

/// Case-insensitive view of the wire headers; repeated names join with ", "
fn response_header_view(headers: &http::HeaderMap) -> HeaderMap {
    let mut view = HeaderMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match view.get(name.as_str()) {
            Some(existing) => {
                let joined = format!("{}, {}", existing, value);
                view.insert(name.as_str(), joined);
            }
            None => {
                view.insert(name.as_str(), value);
            }
        }
    }
    view
}

fn manual_cookie_header(cookies: &[(String, String)]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Referer per policy: the previous URL without credentials or fragment
fn referer_value(url: &Url) -> String {
    let mut referer = url.clone();
    referer.set_fragment(None);
    let _ = referer.set_username("");
    let _ = referer.set_password(None);
    referer.to_string()
}
