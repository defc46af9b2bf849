//! application/x-www-form-urlencoded encoding
//!
//! Key order and duplicate keys are preserved in both directions.

/// Percent-encode key=value pairs
pub fn encode(pairs: &[(String, String)]) -> Vec<u8> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish().into_bytes()
}

/// Parse a form body back into ordered pairs
pub fn decode(data: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(data).into_owned().collect()
}
