//! CBOR encoding of JSON-shaped structured values

use httpr_errors::{Error, Result};

/// Serialise a structured value as CBOR
pub fn encode(value: &serde_json::Value) -> Result<Vec<u8>> {
    serde_cbor::to_vec(value)
        .map_err(|e| Error::LocalProtocol(format!("CBOR encoding failed: {}", e)))
}

/// Parse CBOR bytes into a structured value
pub fn decode(data: &[u8]) -> Result<serde_json::Value> {
    serde_cbor::from_slice(data).map_err(|e| Error::Decoding(format!("invalid CBOR: {}", e)))
}
