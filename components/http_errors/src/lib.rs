//! http_errors component
//!
//! Error taxonomy for the HTTP client: one `Error` enum covering network,
//! timeout, protocol, redirect, decoding and stream failures, with
//! predicates that mirror the hierarchy callers group errors by.
//!
//! The hierarchy, root first:
//!
//! ```text
//! HTTPError
//! ├── RequestError
//! │   ├── TransportError
//! │   │   ├── NetworkError: Connect, Read, Write, Close
//! │   │   ├── Timeout: ConnectTimeout, ReadTimeout, WriteTimeout, PoolTimeout
//! │   │   ├── ProtocolError: LocalProtocol, RemoteProtocol
//! │   │   ├── UnsupportedProtocol
//! │   │   └── Proxy
//! │   ├── TooManyRedirects
//! │   ├── Decoding
//! │   ├── InvalidUrl
//! │   ├── InvalidMethod
//! │   └── CookieConflict
//! ├── HttpStatus (opt-in, raised by an explicit status check)
//! └── StreamError: StreamConsumed, StreamClosed, ResponseNotRead, RequestNotRead
//! ```
//!
//! # Examples
//!
//! ```
//! use httpr_errors::{Error, Result};
//! use std::time::Duration;
//!
//! fn perform_request() -> Result<String> {
//!     Err(Error::ReadTimeout(Duration::from_secs(30)))
//! }
//!
//! let err = perform_request().unwrap_err();
//! assert!(err.is_timeout());
//! assert!(err.is_transport_error());
//! assert!(err.is_request_error());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

use std::time::Duration;
use thiserror::Error;

/// HTTP client error type
///
/// Every failure the client can surface maps to exactly one variant.
/// Grouping predicates (`is_timeout`, `is_transport_error`, ...) answer the
/// hierarchy question; matching on the variant answers the leaf question.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to establish a connection
    #[error("connect error: {0}")]
    Connect(String),

    /// Failed to read from an established connection
    #[error("read error: {0}")]
    Read(String),

    /// Failed to write to an established connection
    #[error("write error: {0}")]
    Write(String),

    /// Failed to close a connection cleanly
    #[error("close error: {0}")]
    Close(String),

    /// Budget exhausted while establishing a connection
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Budget exhausted while waiting for response data
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// Budget exhausted while transmitting the request body
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// Budget exhausted while waiting for a pooled connection
    #[error("pool acquisition timed out after {0:?}")]
    PoolTimeout(Duration),

    /// The client produced an invalid protocol sequence
    #[error("local protocol error: {0}")]
    LocalProtocol(String),

    /// The peer produced an invalid protocol sequence
    #[error("remote protocol error: {0}")]
    RemoteProtocol(String),

    /// URL scheme is not one the client speaks
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Proxy configuration or tunnel establishment failed
    #[error("proxy error: {0}")]
    Proxy(String),

    /// Redirect chain exceeded the configured budget
    #[error("exceeded maximum of {0} redirects")]
    TooManyRedirects(usize),

    /// Response body could not be decoded as requested
    #[error("decoding error: {0}")]
    Decoding(String),

    /// URL could not be parsed or is structurally invalid
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP method outside the supported set
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// A cookie lookup matched more than one stored cookie
    #[error("cookie conflict: {0}")]
    CookieConflict(String),

    /// Opt-in error for 4xx/5xx responses, raised only by an explicit check
    #[error("HTTP status {status} for url: {url}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// URL the response came from
        url: String,
    },

    /// Stream was already fully iterated
    #[error("attempted to iterate a consumed stream")]
    StreamConsumed,

    /// Stream was explicitly closed
    #[error("attempted to read from a closed stream")]
    StreamClosed,

    /// Buffered accessor used before the response body was read
    #[error("response body has not been read")]
    ResponseNotRead,

    /// Request body accessed before it was materialised
    #[error("request body has not been read")]
    RequestNotRead,
}

impl Error {
    /// True for connection-level I/O failures (Connect/Read/Write/Close)
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            Error::Connect(_) | Error::Read(_) | Error::Write(_) | Error::Close(_)
        )
    }

    /// True for all timeout variants
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout(_)
                | Error::ReadTimeout(_)
                | Error::WriteTimeout(_)
                | Error::PoolTimeout(_)
        )
    }

    /// True for protocol violations, local or remote
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::LocalProtocol(_) | Error::RemoteProtocol(_))
    }

    /// True for everything rooted in the transport layer
    pub fn is_transport_error(&self) -> bool {
        self.is_network_error()
            || self.is_timeout()
            || self.is_protocol_error()
            || matches!(self, Error::UnsupportedProtocol(_) | Error::Proxy(_))
    }

    /// True for everything tied to executing a given request
    pub fn is_request_error(&self) -> bool {
        self.is_transport_error()
            || matches!(
                self,
                Error::TooManyRedirects(_)
                    | Error::Decoding(_)
                    | Error::InvalidUrl(_)
                    | Error::InvalidMethod(_)
                    | Error::CookieConflict(_)
            )
    }

    /// True for stream lifecycle violations
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            Error::StreamConsumed
                | Error::StreamClosed
                | Error::ResponseNotRead
                | Error::RequestNotRead
        )
    }

    /// True for the opt-in status-check error
    pub fn is_status_error(&self) -> bool {
        matches!(self, Error::HttpStatus { .. })
    }
}

impl From<std::io::Error> for Error {
    /// Map an I/O error to the closest network variant.
    ///
    /// Stage-specific code should construct the variant directly; this
    /// conversion covers paths where only the I/O error is in hand.
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => Error::ReadTimeout(Duration::ZERO),
            ErrorKind::ConnectionRefused | ErrorKind::NotConnected | ErrorKind::AddrNotAvailable => {
                Error::Connect(err.to_string())
            }
            ErrorKind::BrokenPipe | ErrorKind::WriteZero => Error::Write(err.to_string()),
            _ => Error::Read(err.to_string()),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
