//! Response-side decoding
//!
//! Content-encoding removal (gzip, deflate, brotli, chains), charset-aware
//! text decoding, and the transparent JSON-or-CBOR structured view.

use crate::{brotli_impl, cbor, deflate, gzip};
use bytes::Bytes;
use flate2::write::{GzDecoder, ZlibDecoder};
use httpr_errors::{Error, Result};
use std::io::Write;

/// Supported content encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Gzip compression
    Gzip,
    /// Deflate (zlib) compression
    Deflate,
    /// Brotli compression
    Brotli,
    /// No encoding
    Identity,
}

impl Encoding {
    /// Parse one `Content-Encoding` token
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            "br" => Some(Encoding::Brotli),
            "identity" | "" => Some(Encoding::Identity),
            _ => None,
        }
    }
}

/// The `Accept-Encoding` value the client advertises
pub fn accept_encoding() -> &'static str {
    "gzip, deflate, br"
}

/// Undo a `Content-Encoding` header value, including `,`-separated chains
///
/// Encodings are listed in the order they were applied, so removal runs
/// right to left. An unknown token leaves the remaining payload untouched.
pub fn decode_content(data: Vec<u8>, content_encoding: Option<&str>) -> Result<Vec<u8>> {
    let header = match content_encoding {
        Some(header) => header,
        None => return Ok(data),
    };

    let mut payload = data;
    for token in header.rsplit(',') {
        match Encoding::parse(token) {
            Some(Encoding::Gzip) => payload = gzip::decode(&payload)?,
            Some(Encoding::Deflate) => payload = deflate::decode(&payload)?,
            Some(Encoding::Brotli) => payload = brotli_impl::decode(&payload)?,
            Some(Encoding::Identity) => {}
            None => {
                tracing::debug!(%token, "unknown content encoding left as-is");
                return Ok(payload);
            }
        }
    }
    Ok(payload)
}

/// Incremental decoder for streamed response bodies
///
/// Gzip and deflate decode chunk-by-chunk; brotli and multi-encoding chains
/// buffer internally and emit on `finish` (brotli needs the full input).
pub struct StreamDecoder {
    kind: DecoderKind,
}

enum DecoderKind {
    Identity,
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
    Buffered { header: String, data: Vec<u8> },
}

impl StreamDecoder {
    /// Choose the decoder for a response's `Content-Encoding` header
    pub fn new(content_encoding: Option<&str>) -> Self {
        let kind = match content_encoding {
            None => DecoderKind::Identity,
            Some(header) if header.contains(',') => DecoderKind::Buffered {
                header: header.to_string(),
                data: Vec::new(),
            },
            Some(header) => match Encoding::parse(header) {
                Some(Encoding::Gzip) => DecoderKind::Gzip(GzDecoder::new(Vec::new())),
                Some(Encoding::Deflate) => DecoderKind::Zlib(ZlibDecoder::new(Vec::new())),
                Some(Encoding::Brotli) => DecoderKind::Buffered {
                    header: header.to_string(),
                    data: Vec::new(),
                },
                Some(Encoding::Identity) | None => DecoderKind::Identity,
            },
        };
        Self { kind }
    }

    /// Feed one wire chunk, returning whatever decoded output is ready
    pub fn push(&mut self, chunk: &[u8]) -> Result<Bytes> {
        match &mut self.kind {
            DecoderKind::Identity => Ok(Bytes::copy_from_slice(chunk)),
            DecoderKind::Gzip(decoder) => {
                decoder
                    .write_all(chunk)
                    .map_err(|e| Error::Decoding(format!("gzip stream failed: {}", e)))?;
                Ok(Bytes::from(decoder.get_mut().drain(..).collect::<Vec<u8>>()))
            }
            DecoderKind::Zlib(decoder) => {
                decoder
                    .write_all(chunk)
                    .map_err(|e| Error::Decoding(format!("deflate stream failed: {}", e)))?;
                Ok(Bytes::from(decoder.get_mut().drain(..).collect::<Vec<u8>>()))
            }
            DecoderKind::Buffered { data, .. } => {
                data.extend_from_slice(chunk);
                Ok(Bytes::new())
            }
        }
    }

    /// Flush trailing decoder state once the wire body is complete
    pub fn finish(self) -> Result<Bytes> {
        match self.kind {
            DecoderKind::Identity => Ok(Bytes::new()),
            DecoderKind::Gzip(decoder) => decoder
                .finish()
                .map(Bytes::from)
                .map_err(|e| Error::Decoding(format!("gzip finish failed: {}", e))),
            DecoderKind::Zlib(decoder) => decoder
                .finish()
                .map(Bytes::from)
                .map_err(|e| Error::Decoding(format!("deflate finish failed: {}", e))),
            DecoderKind::Buffered { header, data } => {
                decode_content(data, Some(&header)).map(Bytes::from)
            }
        }
    }
}

/// The charset declared by a `Content-Type` header, defaulting to UTF-8
pub fn charset_of(content_type: Option<&str>) -> &'static encoding_rs::Encoding {
    content_type
        .and_then(|raw| raw.parse::<mime::Mime>().ok())
        .and_then(|mime| {
            mime.get_param(mime::CHARSET)
                .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_str().as_bytes()))
        })
        .unwrap_or(encoding_rs::UTF_8)
}

/// Decode body bytes into text per the declared charset
///
/// Defaults to UTF-8; undecodable sequences become U+FFFD.
pub fn decode_text(data: &[u8], content_type: Option<&str>) -> String {
    let (text, _, _) = charset_of(content_type).decode(data);
    text.into_owned()
}

/// Incremental charset decoder for streamed bodies
///
/// Keeps multi-byte sequences split across chunk boundaries intact.
pub struct TextDecoder {
    inner: encoding_rs::Decoder,
}

impl TextDecoder {
    /// Decoder for the charset a `Content-Type` header declares
    pub fn new(content_type: Option<&str>) -> Self {
        Self {
            inner: charset_of(content_type).new_decoder(),
        }
    }

    /// Decode one chunk, buffering any trailing partial sequence
    pub fn push(&mut self, chunk: &[u8]) -> String {
        let mut out = String::with_capacity(
            self.inner
                .max_utf8_buffer_length(chunk.len())
                .unwrap_or(chunk.len()),
        );
        let _ = self.inner.decode_to_string(chunk, &mut out, false);
        out
    }

    /// Flush the decoder at end of body
    pub fn finish(mut self) -> String {
        let mut out = String::with_capacity(self.inner.max_utf8_buffer_length(0).unwrap_or(4));
        let _ = self.inner.decode_to_string(&[], &mut out, true);
        out
    }
}

/// Splits streamed text into lines, carrying partial lines across chunks
///
/// Line endings (`\n`, `\r\n`) are stripped from the yielded lines.
#[derive(Default)]
pub struct LineDecoder {
    pending: String,
}

impl LineDecoder {
    /// Create an empty line splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text, returning every complete line it closes
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);
        let mut lines = Vec::new();
        while let Some(idx) = self.pending.find('\n') {
            let mut line: String = self.pending.drain(..=idx).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// The trailing unterminated line, if any
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

/// True when the content type names CBOR
pub fn is_cbor_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|raw| raw.parse::<mime::Mime>().ok())
        .map(|mime| mime.type_() == mime::APPLICATION && mime.subtype() == "cbor")
        .unwrap_or(false)
}

/// Structured view: CBOR when the response declares `application/cbor`,
/// JSON otherwise
pub fn json_view(data: &[u8], content_type: Option<&str>) -> Result<serde_json::Value> {
    if is_cbor_content_type(content_type) {
        cbor::decode(data)
    } else {
        serde_json::from_slice(data).map_err(|e| Error::Decoding(format!("invalid JSON: {}", e)))
    }
}

/// Structured view that always parses CBOR
pub fn cbor_view(data: &[u8]) -> Result<serde_json::Value> {
    cbor::decode(data)
}
