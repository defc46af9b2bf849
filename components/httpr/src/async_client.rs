//! Asynchronous client
//!
//! `AsyncClient` is the native-async surface over the execution engine.
//! Defaults live behind a lock and are frozen into a snapshot at request
//! start; the `headers()` view propagates its mutations back through an
//! observer hook.

use crate::builder::ClientBuilder;
use bytes::Bytes;
use httpr_errors::{Error, Result};
use httpr_executor::{resolve, ClientConfig, Executor, RequestPlan, Response, StreamingResponse};
use httpr_types::{Auth, Body, HeaderMap, Method, QueryValue, RequestSpec};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Shared state between a client, its clones and its header views
pub(crate) struct ClientCore {
    config: RwLock<ClientConfig>,
    executor: Executor,
}

impl ClientCore {
    pub(crate) fn new(mut config: ClientConfig) -> Result<Self> {
        config.resolve_proxy();
        let executor = Executor::new(&config)?;
        Ok(Self {
            config: RwLock::new(config),
            executor,
        })
    }

    /// Defaults frozen at request start
    fn snapshot(&self) -> ClientConfig {
        self.config.read().expect("client config lock poisoned").clone()
    }

    fn plan(&self, method: Method, url: &str, spec: RequestSpec) -> Result<RequestPlan> {
        resolve(&self.snapshot(), method, url, spec)
    }

    pub(crate) fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut ClientConfig),
    {
        let mut config = self.config.write().expect("client config lock poisoned");
        apply(&mut config);
    }

    pub(crate) fn read<T>(&self, view: impl FnOnce(&ClientConfig) -> T) -> T {
        view(&self.config.read().expect("client config lock poisoned"))
    }

    pub(crate) fn executor(&self) -> &Executor {
        &self.executor
    }
}

/// Asynchronous HTTP client
///
/// Cheap to clone; clones share the connection pool, cookie jar and
/// mutable defaults.
///
/// # Examples
///
/// ```no_run
/// use httpr::AsyncClient;
///
/// # async fn run() -> httpr::Result<()> {
/// let client = AsyncClient::new()?;
/// let response = client
///     .get("https://example.com/anything")
///     .param("x", "aaa")
///     .header("X-Test", "test")
///     .send()
///     .await?;
/// assert_eq!(response.status_code(), 200);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncClient {
    core: Arc<ClientCore>,
}

impl AsyncClient {
    /// Client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Client from an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            core: Arc::new(ClientCore::new(config)?),
        })
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_core(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> Arc<ClientCore> {
        Arc::clone(&self.core)
    }

    /// Begin a request with an explicit method name
    ///
    /// The method is validated against the supported set; anything else
    /// fails at send time with `Error::InvalidMethod`.
    pub fn request(&self, method: &str, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Method::parse(method), url.into())
    }

    /// Begin a GET request
    pub fn get(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Get), url.into())
    }

    /// Begin a HEAD request
    pub fn head(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Head), url.into())
    }

    /// Begin an OPTIONS request
    pub fn options(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Options), url.into())
    }

    /// Begin a DELETE request
    pub fn delete(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Delete), url.into())
    }

    /// Begin a POST request
    pub fn post(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Post), url.into())
    }

    /// Begin a PUT request
    pub fn put(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Put), url.into())
    }

    /// Begin a PATCH request
    pub fn patch(&self, url: impl Into<String>) -> AsyncRequestBuilder {
        AsyncRequestBuilder::new(Arc::clone(&self.core), Ok(Method::Patch), url.into())
    }

    /// The default-headers view, bound to this client
    ///
    /// Mutations propagate back: inserting or removing here changes the
    /// headers every subsequent request sends. The `Cookie` header is a
    /// jar concern and never appears in the view.
    pub fn headers(&self) -> HeaderMap {
        let core = Arc::clone(&self.core);
        let mut snapshot = core.read(|config| config.headers.detached());
        snapshot.remove("cookie");
        snapshot.with_observer(Arc::new(move |entries| {
            core.update(|config| {
                config.headers =
                    HeaderMap::from_pairs(entries.iter().map(|(k, v)| (k.as_str(), v.clone())));
            });
        }))
    }

    /// Replace the default headers wholesale
    pub fn set_headers<I, K, V>(&self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = HeaderMap::from_pairs(headers);
        self.core.update(|config| config.headers = map);
    }

    /// Replace the default query parameters
    pub fn set_params<I, K, V>(&self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        let params: Vec<(String, QueryValue)> = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.core.update(|config| config.params = params);
    }

    /// Replace the default cookies sent with every request
    pub fn set_cookies<I, K, V>(&self, cookies: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cookies: Vec<(String, String)> = cookies
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.core.update(|config| config.cookies = cookies);
    }

    /// Set Basic credentials as the client default
    pub fn set_auth(&self, username: impl Into<String>, password: Option<&str>) {
        let auth = Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        };
        self.core.update(|config| config.auth = Some(auth));
    }

    /// Set a Bearer token as the client default
    pub fn set_auth_bearer(&self, token: impl Into<String>) {
        let auth = Auth::Bearer(token.into());
        self.core.update(|config| config.auth = Some(auth));
    }

    /// Change the default total timeout
    pub fn set_timeout(&self, timeout: Duration) {
        self.core.update(|config| config.timeout = timeout);
    }

    /// Current default timeout
    pub fn timeout(&self) -> Duration {
        self.core.read(|config| config.timeout)
    }

    /// Current default credentials
    pub fn auth(&self) -> Option<Auth> {
        self.core.read(|config| config.auth.clone())
    }

    /// Current default query parameters
    pub fn params(&self) -> Vec<(String, QueryValue)> {
        self.core.read(|config| config.params.clone())
    }

    /// Current default cookies
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.core.read(|config| config.cookies.clone())
    }

    /// Look up a stored cookie by name
    ///
    /// `Err(Error::CookieConflict)` when several scopes hold the name.
    pub fn get_cookie(&self, name: &str) -> Result<Option<String>> {
        match self.core.executor().cookie_store() {
            Some(jar) => jar.get(name),
            None => Ok(None),
        }
    }
}

/// Builder for one asynchronous request
pub struct AsyncRequestBuilder {
    core: Arc<ClientCore>,
    method: Result<Method>,
    url: String,
    spec: RequestSpec,
    pending_error: Option<Error>,
}

impl AsyncRequestBuilder {
    fn new(core: Arc<ClientCore>, method: Result<Method>, url: String) -> Self {
        Self {
            core,
            method,
            url,
            spec: RequestSpec::default(),
            pending_error: None,
        }
    }

    pub(crate) fn with_spec(
        core: Arc<ClientCore>,
        method: Result<Method>,
        url: String,
        spec: RequestSpec,
        pending_error: Option<Error>,
    ) -> Self {
        Self {
            core,
            method,
            url,
            spec,
            pending_error,
        }
    }

    /// Append one query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.spec.params.push((key.into(), value.into()));
        self
    }

    /// Append query parameters
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.spec
            .params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set one header, overriding the client default of the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.headers.push((name.into(), value.into()));
        self
    }

    /// Set several headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.spec
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add one cookie for this request
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.cookies.push((name.into(), value.into()));
        self
    }

    /// Add several cookies for this request
    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.spec
            .cookies
            .extend(cookies.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Basic credentials for this request only
    pub fn auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.spec.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        });
        self
    }

    /// Bearer token for this request only
    pub fn auth_bearer(mut self, token: impl Into<String>) -> Self {
        self.spec.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Timeout override for this request only
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = Some(timeout);
        self
    }

    /// Raw bytes body
    pub fn content(self, content: impl Into<Bytes>) -> Self {
        self.body(Body::Bytes(content.into()))
    }

    /// Form-urlencoded body
    pub fn form<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body(Body::Form(fields))
    }

    /// JSON body (CBOR-encoded when the request accepts `application/cbor`)
    pub fn json(mut self, value: &impl serde::Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.body(Body::Json(value)),
            Err(err) => {
                self.pending_error.get_or_insert(Error::LocalProtocol(format!(
                    "cannot serialise JSON body: {}",
                    err
                )));
                self
            }
        }
    }

    /// CBOR body
    pub fn cbor(mut self, value: &impl serde::Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.body(Body::Cbor(value)),
            Err(err) => {
                self.pending_error.get_or_insert(Error::LocalProtocol(format!(
                    "cannot serialise CBOR body: {}",
                    err
                )));
                self
            }
        }
    }

    /// Multipart file uploads: field name to file path
    pub fn files<I, K, P>(self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        let files = files
            .into_iter()
            .map(|(k, p)| (k.into(), p.into()))
            .collect();
        self.body(Body::Multipart(files))
    }

    fn body(mut self, body: Body) -> Self {
        if let Err(err) = self.spec.set_body(body) {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    fn into_plan(self) -> Result<(Arc<ClientCore>, RequestPlan)> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        let method = self.method?;
        let plan = self.core.plan(method, &self.url, self.spec)?;
        Ok((self.core, plan))
    }

    /// Execute and buffer the response
    pub async fn send(self) -> Result<Response> {
        let (core, plan) = self.into_plan()?;
        core.executor().execute(plan).await
    }

    /// Execute and return the response after its head, body unread
    pub async fn stream(self) -> Result<StreamingResponse> {
        let (core, plan) = self.into_plan()?;
        core.executor().execute_streaming(plan).await
    }
}
