//! Client-level configuration
//!
//! Everything a client is constructed with; per-request overrides merge on
//! top of these values when the plan is resolved.

use httpr_tls::TlsSettings;
use httpr_types::{Auth, HeaderMap, QueryValue};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when no proxy is configured explicitly
pub const PROXY_ENV_VAR: &str = "HTTPR_PROXY";

/// Client construction options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client-level credentials
    pub auth: Option<Auth>,
    /// Default query parameters, prepended to per-request ones
    pub params: Vec<(String, QueryValue)>,
    /// Default headers
    pub headers: HeaderMap,
    /// Default cookies sent with every request (supplementing the jar)
    pub cookies: Vec<(String, String)>,
    /// Persist received cookies in the jar
    pub cookie_store: bool,
    /// Add `Referer` automatically on redirect hops
    pub referer: bool,
    /// Proxy URL; resolved from `HTTPR_PROXY` at build time when unset
    pub proxy: Option<String>,
    /// Total budget from submission to response head
    pub timeout: Duration,
    /// Follow redirect responses
    pub follow_redirects: bool,
    /// Redirect budget per request
    pub max_redirects: usize,
    /// Verify peer TLS certificates
    pub verify: bool,
    /// Extra CA bundle path
    pub ca_cert_file: Option<PathBuf>,
    /// mTLS client credentials, as a PEM path
    pub client_pem: Option<PathBuf>,
    /// mTLS client credentials, as PEM bytes; wins over the path
    pub client_pem_data: Option<Vec<u8>>,
    /// Reject non-HTTPS request URLs
    pub https_only: bool,
    /// Speak only HTTP/2
    pub http2_only: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth: None,
            params: Vec::new(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            cookie_store: true,
            referer: true,
            proxy: None,
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            max_redirects: 20,
            verify: true,
            ca_cert_file: None,
            client_pem: None,
            client_pem_data: None,
            https_only: false,
            http2_only: false,
        }
    }
}

impl ClientConfig {
    /// Apply the environment proxy fallback, once, at client build time
    pub fn resolve_proxy(&mut self) {
        if self.proxy.is_none() {
            self.proxy = std::env::var(PROXY_ENV_VAR)
                .ok()
                .filter(|value| !value.is_empty());
        }
    }

    /// The TLS options this configuration implies
    pub fn tls_settings(&self) -> TlsSettings {
        TlsSettings {
            verify: self.verify,
            ca_cert_file: self.ca_cert_file.clone(),
            client_pem: self.client_pem.clone(),
            client_pem_data: self.client_pem_data.clone(),
            http2_only: self.http2_only,
        }
    }
}
