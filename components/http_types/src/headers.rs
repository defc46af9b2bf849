//! Case-insensitive header map
//!
//! Keys are stored lowercased (required on the wire for HTTP/2), values
//! verbatim, insertion order preserved. A map can be bound to an observer
//! at construction; every mutation then hands the observer a snapshot of
//! the entries, which is how a client keeps its defaults in sync with the
//! view it hands out.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked with the full entry set after every mutation
pub type HeaderObserver = Arc<dyn Fn(&IndexMap<String, String>) + Send + Sync>;

/// Case-insensitive, insertion-ordered header collection
///
/// # Examples
///
/// ```
/// use httpr_types::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("X-Custom", "value");
/// assert_eq!(headers.get("x-custom"), Some("value"));
/// assert_eq!(headers.get("X-CUSTOM"), Some("value"));
/// ```
#[derive(Clone, Default)]
pub struct HeaderMap {
    entries: IndexMap<String, String>,
    observer: Option<HeaderObserver>,
}

impl HeaderMap {
    /// Create an empty, unbound map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = IndexMap::new();
        for (key, value) in pairs {
            entries.insert(key.as_ref().to_ascii_lowercase(), value.into());
        }
        Self {
            entries,
            observer: None,
        }
    }

    /// Bind an observer; subsequent mutations report the full entry set
    pub fn with_observer(mut self, observer: HeaderObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Insert or replace a header, returning the previous value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        let previous = self
            .entries
            .insert(key.to_ascii_lowercase(), value.into());
        self.notify();
        previous
    }

    /// Look up a header value, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Remove a header, returning its value when present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        // shift_remove keeps the remaining insertion order intact
        let removed = self.entries.shift_remove(&key.to_ascii_lowercase());
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Insert `value` only when the key is absent; returns the value in place
    pub fn set_default(&mut self, key: &str, value: &str) -> String {
        let key = key.to_ascii_lowercase();
        let inserted = !self.entries.contains_key(&key);
        let current = self
            .entries
            .entry(key)
            .or_insert_with(|| value.to_string())
            .clone();
        if inserted {
            self.notify();
        }
        current
    }

    /// Merge key/value pairs, later pairs replacing earlier on key clash
    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.entries
                .insert(key.as_ref().to_ascii_lowercase(), value.into());
        }
        self.notify();
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.notify();
    }

    /// Case-insensitive membership test
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no headers are present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order; keys are lowercase
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Snapshot without the observer binding; mutations do not propagate
    pub fn detached(&self) -> HeaderMap {
        HeaderMap {
            entries: self.entries.clone(),
            observer: None,
        }
    }

    /// Borrow the underlying lowercase-keyed entries
    pub fn entries(&self) -> &IndexMap<String, String> {
        &self.entries
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.entries);
        }
    }
}

impl std::fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderMap")
            .field("entries", &self.entries)
            .finish()
    }
}

impl PartialEq for HeaderMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl PartialEq<HashMap<String, String>> for HeaderMap {
    /// Compare against a plain map, treating both sides case-insensitively
    fn eq(&self, other: &HashMap<String, String>) -> bool {
        if self.entries.len() != other.len() {
            return false;
        }
        other.iter().all(|(key, value)| {
            self.entries.get(&key.to_ascii_lowercase()) == Some(value)
        })
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
