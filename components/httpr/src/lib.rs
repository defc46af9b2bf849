//! httpr
//!
//! High-performance HTTP client with a blocking [`Client`], an
//! asynchronous [`AsyncClient`] and one-shot free functions ([`get`],
//! [`post`], ...). Requests are declarative: URL, query parameters,
//! headers, cookies, credentials, a timeout and at most one body (raw
//! bytes, form, JSON, CBOR or multipart files). Responses offer status,
//! case-insensitive headers, raw bytes, decoded text and structured
//! `json()`/`cbor()` views, or can be consumed as a lazy stream of chunks,
//! text fragments or lines.
//!
//! # Examples
//!
//! ```no_run
//! # fn run() -> httpr::Result<()> {
//! let response = httpr::get("https://example.com/anything")
//!     .param("x", "aaa")
//!     .header("X-Test", "test")
//!     .send()?;
//! println!("{} {}", response.status_code(), response.text());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod async_client;
mod builder;
mod client;

pub use async_client::{AsyncClient, AsyncRequestBuilder};
pub use builder::ClientBuilder;
pub use client::{BlockingStreamingResponse, Client, RequestBuilder};
pub use httpr_cookies::CookieStore;
pub use httpr_errors::{Error, Result};
pub use httpr_executor::{ClientConfig, Response, StreamingResponse, PROXY_ENV_VAR};
pub use httpr_types::{Auth, Body, HeaderMap, Method, QueryValue, RequestSpec};

use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;

/// Begin a one-shot request with an explicit method name
///
/// A throwaway client backs the request; TLS options (`verify`,
/// `ca_cert_file`, `client_pem`) can be set on the builder alongside the
/// per-request options.
pub fn request(method: &str, url: impl Into<String>) -> OneShotRequestBuilder {
    OneShotRequestBuilder::new(method, url.into())
}

/// One-shot GET
pub fn get(url: impl Into<String>) -> OneShotRequestBuilder {
    request("GET", url)
}

/// One-shot HEAD
pub fn head(url: impl Into<String>) -> OneShotRequestBuilder {
    request("HEAD", url)
}

/// One-shot OPTIONS
pub fn options(url: impl Into<String>) -> OneShotRequestBuilder {
    request("OPTIONS", url)
}

/// One-shot DELETE
pub fn delete(url: impl Into<String>) -> OneShotRequestBuilder {
    request("DELETE", url)
}

/// One-shot POST
pub fn post(url: impl Into<String>) -> OneShotRequestBuilder {
    request("POST", url)
}

/// One-shot PUT
pub fn put(url: impl Into<String>) -> OneShotRequestBuilder {
    request("PUT", url)
}

/// One-shot PATCH
pub fn patch(url: impl Into<String>) -> OneShotRequestBuilder {
    request("PATCH", url)
}

/// Builder for a request executed on a throwaway client
pub struct OneShotRequestBuilder {
    method: String,
    url: String,
    config: ClientConfig,
    spec: RequestSpec,
    pending_error: Option<Error>,
}

impl OneShotRequestBuilder {
    fn new(method: &str, url: String) -> Self {
        Self {
            method: method.to_string(),
            url,
            config: ClientConfig::default(),
            spec: RequestSpec::default(),
            pending_error: None,
        }
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

    /// Set one header
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

    /// Add one cookie
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.cookies.push((name.into(), value.into()));
        self
    }

    /// Add several cookies
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

    /// Basic credentials
    pub fn auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.spec.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        });
        self
    }

    /// Bearer token
    pub fn auth_bearer(mut self, token: impl Into<String>) -> Self {
        self.spec.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Request timeout
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

    /// JSON body
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

    /// Multipart file uploads
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

    /// Execute on a throwaway client and buffer the response
    pub fn send(self) -> Result<Response> {
        let client = Client::with_config(self.config)?;
        client
            .request_with_spec(
                Method::parse(&self.method),
                self.url,
                self.spec,
                self.pending_error,
            )
            .send()
    }
}
