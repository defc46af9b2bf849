//! Client configuration builder

use crate::async_client::{AsyncClient, ClientCore};
use crate::client::Client;
use httpr_errors::Result;
use httpr_executor::ClientConfig;
use httpr_types::{Auth, HeaderMap, QueryValue};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builds a [`Client`] or [`AsyncClient`]
///
/// # Examples
///
/// ```no_run
/// use httpr::Client;
/// use std::time::Duration;
///
/// # fn run() -> httpr::Result<()> {
/// let client = Client::builder()
///     .timeout(Duration::from_secs(10))
///     .max_redirects(5)
///     .https_only(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Start from the documented defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Basic credentials attached as `Authorization: Basic ...`
    pub fn auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.config.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        });
        self
    }

    /// Bearer token attached as `Authorization: Bearer ...`
    pub fn auth_bearer(mut self, token: impl Into<String>) -> Self {
        self.config.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Default query parameters appended to every request URL
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.config.params = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Default headers sent with every request
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.config.headers = HeaderMap::from_pairs(headers);
        self
    }

    /// Initial cookies sent with every request
    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.cookies = cookies
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Persist received cookies in the jar (default true)
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.config.cookie_store = enabled;
        self
    }

    /// Automatically add `Referer` on redirects (default true)
    pub fn referer(mut self, enabled: bool) -> Self {
        self.config.referer = enabled;
        self
    }

    /// Proxy URL, e.g. `socks5://127.0.0.1:9150`
    ///
    /// Falls back to the `HTTPR_PROXY` environment variable when unset.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Total request timeout (default 30 s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Follow redirect responses (default true)
    pub fn follow_redirects(mut self, enabled: bool) -> Self {
        self.config.follow_redirects = enabled;
        self
    }

    /// Redirect budget (default 20)
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Verify TLS certificates (default true)
    pub fn verify(mut self, enabled: bool) -> Self {
        self.config.verify = enabled;
        self
    }

    /// Additional PEM root CA bundle
    pub fn ca_cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_cert_file = Some(path.into());
        self
    }

    /// mTLS client certificate and key, as a PEM file path
    pub fn client_pem(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_pem = Some(path.into());
        self
    }

    /// mTLS client certificate and key, as PEM bytes (wins over the path)
    pub fn client_pem_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.config.client_pem_data = Some(data.into());
        self
    }

    /// Reject non-HTTPS URLs (default false)
    pub fn https_only(mut self, enabled: bool) -> Self {
        self.config.https_only = enabled;
        self
    }

    /// Speak only HTTP/2 (default false)
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.config.http2_only = enabled;
        self
    }

    /// Finish as a blocking client
    pub fn build(self) -> Result<Client> {
        Client::with_config(self.config)
    }

    /// Finish as an asynchronous client
    pub fn build_async(self) -> Result<AsyncClient> {
        Ok(AsyncClient::from_core(Arc::new(ClientCore::new(self.config)?)))
    }
}
