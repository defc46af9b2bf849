use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use httpr_errors::{Error, Result};
use std::io::Write;

/// Encode data using deflate (zlib-wrapped, as HTTP expects)
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Decoding(format!("deflate encoding failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::Decoding(format!("deflate finish failed: {}", e)))
}

/// Decode deflate-compressed data
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Vec::new());
    decoder
        .write_all(data)
        .map_err(|e| Error::Decoding(format!("deflate decoding failed: {}", e)))?;
    decoder
        .finish()
        .map_err(|e| Error::Decoding(format!("deflate finish failed: {}", e)))
}
