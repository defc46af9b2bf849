//! Cookie jar internals
//!
//! Holds stored cookies keyed by (name, domain, path) and answers
//! URL-scoped match queries.

use cookie::{Cookie, Expiration};
use std::collections::HashMap;
use time::{Duration as TimeDuration, OffsetDateTime};
use url::Url;

/// A cookie at rest, with its effective scope resolved
#[derive(Debug, Clone)]
pub(crate) struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    /// Set when the Set-Cookie carried no Domain attribute; the cookie then
    /// matches the origin host exactly, never subdomains
    host_only: bool,
    path: String,
    secure: bool,
    expires_at: Option<OffsetDateTime>,
}

impl StoredCookie {
    /// Name of the cookie
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Effective domain scope
    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// In-memory cookie jar
///
/// Not synchronised; `CookieStore` wraps it behind a lock for shared use.
#[derive(Debug, Default)]
pub(crate) struct Jar {
    cookies: HashMap<(String, String, String), StoredCookie>,
}

impl Jar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parsed `Set-Cookie` received from `url`
    ///
    /// Validates the Domain attribute against the origin host, resolves the
    /// default path, and converts `Max-Age`/`Expires` into an absolute
    /// expiry (`Max-Age` wins when both are present). An already-expired
    /// cookie removes any stored entry with the same key.
    pub fn insert(&mut self, cookie: &Cookie<'_>, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };

        let (domain, host_only) = match cookie.domain() {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if !domain_suffix_matches(&domain, &host) {
                    tracing::warn!(
                        cookie = cookie.name(),
                        %domain,
                        %host,
                        "rejecting cookie: domain does not cover origin host"
                    );
                    return false;
                }
                (domain, false)
            }
            None => (host, true),
        };

        let path = match cookie.path() {
            Some(path) if path.starts_with('/') => path.to_string(),
            _ => default_path(url),
        };

        let now = OffsetDateTime::now_utc();
        let expires_at = match cookie.max_age() {
            Some(max_age) => Some(now + TimeDuration::seconds(max_age.whole_seconds())),
            None => match cookie.expires() {
                Some(Expiration::DateTime(at)) => Some(at),
                _ => None,
            },
        };

        let key = (cookie.name().to_string(), domain.clone(), path.clone());
        let stored = StoredCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain,
            host_only,
            path,
            secure: cookie.secure().unwrap_or(false),
            expires_at,
        };

        if stored.is_expired(now) {
            self.cookies.remove(&key);
            return false;
        }
        self.cookies.insert(key, stored);
        true
    }

    /// Cookies applicable to a request for `url`, expired entries dropped
    pub fn matches(&mut self, url: &Url) -> Vec<StoredCookie> {
        let now = OffsetDateTime::now_utc();
        self.cookies.retain(|_, cookie| !cookie.is_expired(now));

        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return Vec::new(),
        };
        let is_https = url.scheme() == "https";
        let request_path = url.path();

        let mut matched: Vec<StoredCookie> = self
            .cookies
            .values()
            .filter(|cookie| {
                if cookie.secure && !is_https {
                    return false;
                }
                let domain_ok = if cookie.host_only {
                    cookie.domain == host
                } else {
                    domain_suffix_matches(&cookie.domain, &host)
                };
                domain_ok && path_prefix_matches(&cookie.path, request_path)
            })
            .cloned()
            .collect();

        // Longest path first, per RFC 6265 §5.4 serialisation order
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matched
    }

    /// Every stored cookie with the given name, any scope
    pub fn find_by_name(&self, name: &str) -> Vec<&StoredCookie> {
        self.cookies
            .values()
            .filter(|cookie| cookie.name == name)
            .collect()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

/// RFC 6265 domain matching: exact, or host ends with `.domain`
fn domain_suffix_matches(domain: &str, host: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// RFC 6265 path matching with a proper path boundary
fn path_prefix_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if request_path.starts_with(cookie_path) {
        return cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/');
    }
    false
}

/// Default cookie path: the request path up to its last slash
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
