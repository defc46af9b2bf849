use httpr_errors::{Error, Result};
use std::io::{Read, Write};

/// Encode data using brotli compression
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut output, 4096, 5, 22);
        writer
            .write_all(data)
            .map_err(|e| Error::Decoding(format!("brotli encoding failed: {}", e)))?;
    }
    Ok(output)
}

/// Decode brotli-compressed data
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressor = brotli::Decompressor::new(data, 4096);
    let mut output = Vec::new();
    decompressor
        .read_to_end(&mut output)
        .map_err(|e| Error::Decoding(format!("brotli decoding failed: {}", e)))?;
    Ok(output)
}
