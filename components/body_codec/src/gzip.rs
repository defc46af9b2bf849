use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;
use httpr_errors::{Error, Result};
use std::io::Write;

/// Encode data using gzip compression
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Decoding(format!("gzip encoding failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::Decoding(format!("gzip finish failed: {}", e)))
}

/// Decode gzip-compressed data
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(Vec::new());
    decoder
        .write_all(data)
        .map_err(|e| Error::Decoding(format!("gzip decoding failed: {}", e)))?;
    decoder
        .finish()
        .map_err(|e| Error::Decoding(format!("gzip finish failed: {}", e)))
}
