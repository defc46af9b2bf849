//! Plan resolution
//!
//! Merges client defaults and per-request overrides into the effective
//! wire-level request: absolute URL with concatenated query, final header
//! list, merged cookies, collapsed credentials and the timeout budget.

use crate::config::ClientConfig;
use httpr_errors::{Error, Result};
use httpr_types::{Body, Method, RequestSpec};
use url::Url;

/// The fully merged request, rebuilt per redirect hop
#[derive(Debug, Clone)]
pub struct RequestPlan {
    /// HTTP method
    pub method: Method,
    /// Absolute URL with client and request query parameters appended
    pub url: Url,
    /// Final ordered header list; names lowercase, values verbatim
    pub headers: Vec<(String, String)>,
    /// Merged default + per-request cookies (request wins on name clash)
    pub request_cookies: Vec<(String, String)>,
    /// Pre-rendered `Authorization` value, when credentials apply
    pub auth_header: Option<String>,
    /// Body to encode at send time
    pub body: Option<Body>,
    /// Effective total timeout
    pub timeout: std::time::Duration,
    /// Whether redirects are chased
    pub follow_redirects: bool,
    /// Redirect budget
    pub max_redirects: usize,
}

/// Resolve `(config, spec)` into a plan
///
/// # Errors
///
/// `Error::InvalidUrl` for unparseable URLs, `Error::UnsupportedProtocol`
/// for non-http(s) schemes or cleartext URLs under `https_only`.
pub fn resolve(
    config: &ClientConfig,
    method: Method,
    raw_url: &str,
    spec: RequestSpec,
) -> Result<RequestPlan> {
    let mut url = Url::parse(raw_url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", raw_url, e)))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if config.https_only {
                return Err(Error::UnsupportedProtocol(format!(
                    "client is restricted to HTTPS, got {}",
                    raw_url
                )));
            }
        }
        other => {
            return Err(Error::UnsupportedProtocol(format!(
                "scheme {:?} is not supported",
                other
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(Error::InvalidUrl(format!("{}: missing host", raw_url)));
    }

    // Query concatenation: client defaults first, then per-request pairs.
    // Duplicates are preserved to support repeated-key query strings.
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &config.params {
            pairs.append_pair(key, &value.to_string());
        }
        for (key, value) in &spec.params {
            pairs.append_pair(key, &value.to_string());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }

    // Header merge: defaults first, per-request values win on key clash.
    // The jar owns the Cookie header; a default named "cookie" never
    // reaches the wire directly.
    let mut headers = config.headers.detached();
    headers.remove("cookie");
    headers.extend(spec.headers.iter().map(|(k, v)| (k.as_str(), v.clone())));

    // Cookie merge: defaults first, per-request values win on name clash
    let mut request_cookies = config.cookies.clone();
    for (name, value) in &spec.cookies {
        if let Some(existing) = request_cookies.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.clone();
        } else {
            request_cookies.push((name.clone(), value.clone()));
        }
    }

    // Per-request credential beats the client's
    let auth_header = spec
        .auth
        .as_ref()
        .or(config.auth.as_ref())
        .map(|auth| auth.header_value());

    Ok(RequestPlan {
        method,
        url,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        request_cookies,
        auth_header,
        body: spec.body,
        timeout: spec.timeout.unwrap_or(config.timeout),
        follow_redirects: config.follow_redirects,
        max_redirects: config.max_redirects,
    })
}
