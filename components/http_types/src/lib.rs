//! http_types component
//!
//! Core types for the HTTP client: the method allow-list, request bodies,
//! credentials, query values and the case-insensitive header map.
//!
//! This component provides the fundamental data structures shared by the
//! transport, executor and public client layers.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod headers;

pub use headers::{HeaderMap, HeaderObserver};

use bytes::Bytes;
use httpr_errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP methods the client accepts
///
/// Anything outside this set is rejected at request-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// GET method - retrieve data
    Get,
    /// HEAD method - retrieve headers only
    Head,
    /// OPTIONS method - describe communication options
    Options,
    /// DELETE method - remove resource
    Delete,
    /// POST method - submit data
    Post,
    /// PUT method - replace resource
    Put,
    /// PATCH method - partial modification
    Patch,
}

impl Method {
    /// Parse a method name, case-insensitively
    ///
    /// # Examples
    ///
    /// ```
    /// use httpr_types::Method;
    ///
    /// assert_eq!(Method::parse("get").unwrap(), Method::Get);
    /// assert!(Method::parse("BREW").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "DELETE" => Ok(Method::Delete),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            _ => Err(Error::InvalidMethod(name.to_string())),
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Delete => "DELETE",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
        }
    }

    /// Whether the transport may transparently retry this method once after
    /// a reuse failure
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Method::Get | Method::Head | Method::Options | Method::Put | Method::Delete
        )
    }

    /// Convert to the wire-level `http::Method`
    pub fn to_http(self) -> http::Method {
        match self {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Delete => http::Method::DELETE,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::parse(s)
    }
}

/// Request credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Basic credentials: username and optional password
    Basic {
        /// Account name
        username: String,
        /// Optional password; empty when absent
        password: Option<String>,
    },
    /// Bearer token
    Bearer(String),
}

impl Auth {
    /// Render the `Authorization` header value
    ///
    /// # Examples
    ///
    /// ```
    /// use httpr_types::Auth;
    ///
    /// let auth = Auth::Basic {
    ///     username: "user".into(),
    ///     password: Some("password".into()),
    /// };
    /// assert_eq!(auth.header_value(), "Basic dXNlcjpwYXNzd29yZA==");
    /// ```
    pub fn header_value(&self) -> String {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        match self {
            Auth::Basic { username, password } => {
                let raw = format!("{}:{}", username, password.as_deref().unwrap_or(""));
                format!("Basic {}", STANDARD.encode(raw))
            }
            Auth::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

/// Query parameter value
///
/// Numeric and boolean values are coerced to their shortest faithful string
/// representation before URL encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Verbatim string value
    Str(String),
    /// Signed integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value, rendered as `true`/`false`
    Bool(bool),
}

impl std::fmt::Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value as i64)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// Request body variants
///
/// Exactly one body kind may be attached to a request; the builder rejects
/// a second assignment.
#[derive(Debug, Clone)]
pub enum Body {
    /// Raw bytes, content type left to the caller
    Bytes(Bytes),
    /// Form fields, encoded as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Structured value, encoded as `application/json` (or CBOR when the
    /// request's `Accept` header asks for `application/cbor`)
    Json(serde_json::Value),
    /// Structured value, encoded as `application/cbor`
    Cbor(serde_json::Value),
    /// Multipart file uploads: field name to file path, each part streamed
    /// from disk
    Multipart(Vec<(String, PathBuf)>),
}

impl Body {
    /// Whether the body can be sent again on a 307/308 redirect hop
    ///
    /// Multipart parts are streamed from disk once and cannot be replayed.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Body::Multipart(_))
    }
}

/// Per-request options, before merging with client defaults
///
/// Lives only for one execution; the executor consumes it to build the
/// per-hop wire plan.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    /// Query parameters appended after the client's defaults
    pub params: Vec<(String, QueryValue)>,
    /// Headers that override client defaults on key clash
    pub headers: Vec<(String, String)>,
    /// Cookies supplementing the jar, winning on name clash
    pub cookies: Vec<(String, String)>,
    /// Credential override; beats the client's credential when set
    pub auth: Option<Auth>,
    /// Timeout override for this request only
    pub timeout: Option<Duration>,
    /// At most one body
    pub body: Option<Body>,
}

impl RequestSpec {
    /// Attach a body, rejecting a second assignment
    pub fn set_body(&mut self, body: Body) -> Result<()> {
        if self.body.is_some() {
            return Err(Error::LocalProtocol(
                "only one of content, data, json, cbor or files may be set".to_string(),
            ));
        }
        self.body = Some(body);
        Ok(())
    }
}
