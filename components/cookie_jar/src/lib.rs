//! cookie_jar component
//!
//! Domain/path-scoped cookie store with extract/inject semantics: every
//! response's `Set-Cookie` directives update the jar before the response is
//! handed to the caller, and every outgoing request receives the cookies
//! whose scope matches its URL.
//!
//! # Examples
//!
//! ```
//! use httpr_cookies::CookieStore;
//! use url::Url;
//!
//! let store = CookieStore::new();
//! let url = Url::parse("https://example.com/login").unwrap();
//! store.store_response_cookies(&url, ["session=abc123; Path=/".to_string()].into_iter());
//!
//! let header = store.cookie_header(&url, &[]).unwrap();
//! assert_eq!(header, "session=abc123");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod jar;

use cookie::Cookie;
use httpr_errors::{Error, Result};
use jar::Jar;
use std::sync::Mutex;
use url::Url;

/// Thread-safe cookie store shared by a client and its in-flight requests
///
/// Lives only in memory for the client's lifetime.
#[derive(Debug, Default)]
pub struct CookieStore {
    inner: Mutex<Jar>,
}

impl CookieStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Jar::new()),
        }
    }

    /// Parse and store every `Set-Cookie` value from a response
    ///
    /// Invalid directives are logged and skipped; the update is atomic with
    /// respect to concurrent readers.
    pub fn store_response_cookies<I>(&self, url: &Url, set_cookie_values: I)
    where
        I: Iterator<Item = String>,
    {
        let mut jar = self.inner.lock().expect("cookie jar lock poisoned");
        for raw in set_cookie_values {
            match Cookie::parse(raw.clone()) {
                Ok(cookie) => {
                    if jar.insert(&cookie, url) {
                        tracing::trace!(cookie = cookie.name(), host = ?url.host_str(), "stored cookie");
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, %raw, "skipping unparseable Set-Cookie");
                }
            }
        }
    }

    /// Cookies whose scope matches `url`, as (name, value) pairs
    pub fn cookies_for(&self, url: &Url) -> Vec<(String, String)> {
        let mut jar = self.inner.lock().expect("cookie jar lock poisoned");
        jar.matches(url)
            .into_iter()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect()
    }

    /// Serialise the `Cookie` header for a request to `url`
    ///
    /// `extra` pairs supplement the jar-sourced cookies and win on name
    /// clash. Returns `None` when nothing applies.
    pub fn cookie_header(&self, url: &Url, extra: &[(String, String)]) -> Option<String> {
        let mut pairs = self.cookies_for(url);
        for (name, value) in extra {
            if let Some(existing) = pairs.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value.clone();
            } else {
                pairs.push((name.clone(), value.clone()));
            }
        }
        if pairs.is_empty() {
            return None;
        }
        Some(
            pairs
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Look up a cookie value by name, across all scopes
    ///
    /// # Errors
    ///
    /// `Error::CookieConflict` when more than one stored cookie carries the
    /// name; disambiguate by URL with [`CookieStore::cookies_for`].
    pub fn get(&self, name: &str) -> Result<Option<String>> {
        let jar = self.inner.lock().expect("cookie jar lock poisoned");
        let found = jar.find_by_name(name);
        match found.len() {
            0 => Ok(None),
            1 => Ok(Some(found[0].value().to_string())),
            _ => Err(Error::CookieConflict(format!(
                "multiple cookies named {:?} (domains: {})",
                name,
                found
                    .iter()
                    .map(|cookie| cookie.domain())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Remove every stored cookie
    pub fn clear(&self) {
        self.inner.lock().expect("cookie jar lock poisoned").clear();
    }

    /// Number of stored cookies
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cookie jar lock poisoned").len()
    }

    /// True when the jar holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
