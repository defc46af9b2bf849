//! Blocking client
//!
//! A thin facade over the async core: the client owns a multi-thread
//! runtime and drives each request future to completion on the caller's
//! behalf. The transport underneath is identical to the async path.

use crate::async_client::{AsyncClient, AsyncRequestBuilder};
use crate::builder::ClientBuilder;
use bytes::Bytes;
use httpr_codec::{LineDecoder, TextDecoder};
use httpr_errors::{Error, Result};
use httpr_executor::{ClientConfig, Response, StreamingResponse};
use httpr_types::{Auth, HeaderMap, QueryValue};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Synchronous HTTP client
///
/// Blocks the calling thread for the duration of each request; I/O runs on
/// an internal work-stealing runtime shared by all clones.
///
/// # Examples
///
/// ```no_run
/// use httpr::Client;
///
/// # fn run() -> httpr::Result<()> {
/// let client = Client::new()?;
/// let response = client
///     .get("https://example.com/anything")
///     .param("x", "aaa")
///     .send()?;
/// println!("{}", response.text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: AsyncClient,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl Client {
    /// Client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Client from an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Connect(format!("cannot start I/O runtime: {}", e)))?;
        Ok(Self {
            inner: AsyncClient::with_config(config)?,
            runtime: Arc::new(runtime),
        })
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Begin a request with an explicit method name
    pub fn request(&self, method: &str, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.request(method, url))
    }

    /// Begin a GET request
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.get(url))
    }

    /// Begin a HEAD request
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.head(url))
    }

    /// Begin an OPTIONS request
    pub fn options(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.options(url))
    }

    /// Begin a DELETE request
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.delete(url))
    }

    /// Begin a POST request
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.post(url))
    }

    /// Begin a PUT request
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.put(url))
    }

    /// Begin a PATCH request
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.wrap(self.inner.patch(url))
    }

    fn wrap(&self, inner: AsyncRequestBuilder) -> RequestBuilder {
        RequestBuilder {
            inner,
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub(crate) fn request_with_spec(
        &self,
        method: Result<httpr_types::Method>,
        url: String,
        spec: httpr_types::RequestSpec,
        pending_error: Option<Error>,
    ) -> RequestBuilder {
        self.wrap(AsyncRequestBuilder::with_spec(
            self.inner.core(),
            method,
            url,
            spec,
            pending_error,
        ))
    }

    /// The default-headers view, bound to this client (see
    /// [`AsyncClient::headers`])
    pub fn headers(&self) -> HeaderMap {
        self.inner.headers()
    }

    /// Replace the default headers wholesale
    pub fn set_headers<I, K, V>(&self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.inner.set_headers(headers);
    }

    /// Replace the default query parameters
    pub fn set_params<I, K, V>(&self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.inner.set_params(params);
    }

    /// Replace the default cookies
    pub fn set_cookies<I, K, V>(&self, cookies: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.set_cookies(cookies);
    }

    /// Set Basic credentials as the client default
    pub fn set_auth(&self, username: impl Into<String>, password: Option<&str>) {
        self.inner.set_auth(username, password);
    }

    /// Set a Bearer token as the client default
    pub fn set_auth_bearer(&self, token: impl Into<String>) {
        self.inner.set_auth_bearer(token);
    }

    /// Change the default total timeout
    pub fn set_timeout(&self, timeout: Duration) {
        self.inner.set_timeout(timeout);
    }

    /// Current default timeout
    pub fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// Current default credentials
    pub fn auth(&self) -> Option<Auth> {
        self.inner.auth()
    }

    /// Current default query parameters
    pub fn params(&self) -> Vec<(String, QueryValue)> {
        self.inner.params()
    }

    /// Current default cookies
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.inner.cookies()
    }

    /// Look up a stored cookie by name
    pub fn get_cookie(&self, name: &str) -> Result<Option<String>> {
        self.inner.get_cookie(name)
    }
}

/// Builder for one blocking request
pub struct RequestBuilder {
    inner: AsyncRequestBuilder,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl RequestBuilder {
    /// Append one query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.inner = self.inner.param(key, value);
        self
    }

    /// Append query parameters
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.inner = self.inner.params(params);
        self
    }

    /// Set one header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    /// Set several headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner = self.inner.headers(headers);
        self
    }

    /// Add one cookie for this request
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.cookie(name, value);
        self
    }

    /// Add several cookies for this request
    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner = self.inner.cookies(cookies);
        self
    }

    /// Basic credentials for this request only
    pub fn auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.inner = self.inner.auth(username, password);
        self
    }

    /// Bearer token for this request only
    pub fn auth_bearer(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.auth_bearer(token);
        self
    }

    /// Timeout override for this request only
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Raw bytes body
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.inner = self.inner.content(content);
        self
    }

    /// Form-urlencoded body
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inner = self.inner.form(fields);
        self
    }

    /// JSON body
    pub fn json(mut self, value: &impl serde::Serialize) -> Self {
        self.inner = self.inner.json(value);
        self
    }

    /// CBOR body
    pub fn cbor(mut self, value: &impl serde::Serialize) -> Self {
        self.inner = self.inner.cbor(value);
        self
    }

    /// Multipart file uploads
    pub fn files<I, K, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        self.inner = self.inner.files(files);
        self
    }

    /// Execute and buffer the response, blocking until complete
    pub fn send(self) -> Result<Response> {
        self.runtime.block_on(self.inner.send())
    }

    /// Execute and return a streaming response, blocking until the head
    pub fn stream(self) -> Result<BlockingStreamingResponse> {
        let runtime = Arc::clone(&self.runtime);
        let inner = runtime.block_on(self.inner.stream())?;
        Ok(BlockingStreamingResponse { inner, runtime })
    }
}

/// Blocking view over a streaming response
///
/// Same single-pass lifecycle as the async variant; each read drives the
/// body future on the client's runtime.
pub struct BlockingStreamingResponse {
    inner: StreamingResponse,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl BlockingStreamingResponse {
    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.inner.status_code()
    }

    /// Canonical reason phrase
    pub fn reason(&self) -> &str {
        self.inner.reason()
    }

    /// Case-insensitive response headers
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Final URL after redirects
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Whether the stream was closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Whether the body was fully iterated
    pub fn is_consumed(&self) -> bool {
        self.inner.is_consumed()
    }

    /// Next decoded chunk; `Ok(None)` at end of body
    pub fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.runtime.clone().block_on(self.inner.chunk())
    }

    /// Drain the remaining body
    pub fn read(&mut self) -> Result<Bytes> {
        self.runtime.clone().block_on(self.inner.read())
    }

    /// Release the body channel; later reads raise `StreamClosed`
    pub fn close(&mut self) {
        self.inner.close();
    }

    /// Lazy sequence of decoded byte chunks
    pub fn iter_bytes(&mut self) -> impl Iterator<Item = Result<Bytes>> + '_ {
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            match self.chunk() {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => None,
                Err(err) => {
                    done = true;
                    Some(Err(err))
                }
            }
        })
    }

    /// Lazy sequence of text fragments decoded per the response charset
    pub fn iter_text(&mut self) -> impl Iterator<Item = Result<String>> + '_ {
        let mut decoder = Some(TextDecoder::new(self.inner.headers().get("content-type")));
        std::iter::from_fn(move || loop {
            let mut active = decoder.take()?;
            match self.chunk() {
                Ok(Some(chunk)) => {
                    let text = active.push(&chunk);
                    decoder = Some(active);
                    if text.is_empty() {
                        continue;
                    }
                    return Some(Ok(text));
                }
                Ok(None) => {
                    let tail = active.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    return Some(Ok(tail));
                }
                Err(err) => return Some(Err(err)),
            }
        })
    }

    /// Lazy sequence of lines, endings stripped
    pub fn iter_lines(&mut self) -> impl Iterator<Item = Result<String>> + '_ {
        let mut state = Some((
            TextDecoder::new(self.inner.headers().get("content-type")),
            LineDecoder::new(),
        ));
        let mut pending: Vec<String> = Vec::new();
        std::iter::from_fn(move || loop {
            if !pending.is_empty() {
                return Some(Ok(pending.remove(0)));
            }
            let (mut text, mut lines) = state.take()?;
            match self.chunk() {
                Ok(Some(chunk)) => {
                    pending = lines.push(&text.push(&chunk));
                    state = Some((text, lines));
                }
                Ok(None) => {
                    let mut rest = lines.push(&text.finish());
                    if let Some(last) = lines.finish() {
                        rest.push(last);
                    }
                    pending = rest;
                    if pending.is_empty() {
                        return None;
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        })
    }
}

impl std::fmt::Debug for BlockingStreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}
