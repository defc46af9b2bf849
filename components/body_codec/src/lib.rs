//! body_codec component
//!
//! Pluggable request-body encoders and response-body decoders.
//!
//! Request side: each body kind maps to an `(encoder, content-type)` pair:
//! raw bytes pass through, forms percent-encode, structured values encode as
//! JSON or CBOR, and multipart file uploads stream from disk. Response side:
//! content encodings (gzip/deflate/br) are removed, text decodes per the
//! declared charset, and `json`/`cbor` views parse structured bodies with
//! transparent CBOR selection by content type.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod brotli_impl;
pub mod cbor;
mod decode;
mod deflate;
pub mod form;
mod gzip;
pub mod multipart;

pub use decode::{
    accept_encoding, cbor_view, charset_of, decode_content, decode_text, is_cbor_content_type,
    json_view, Encoding, LineDecoder, StreamDecoder, TextDecoder,
};

use bytes::Bytes;
use futures::Stream;
use httpr_errors::Result;
use httpr_types::Body;
use std::pin::Pin;

/// Lazy request-body byte stream
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Request payload: fully materialised, or streamed with unknown length
pub enum Payload {
    /// Body bytes known up front; sent with `Content-Length`
    Full(Bytes),
    /// Lazily produced body; sent with chunked transfer encoding
    Stream(ByteStream),
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Full(bytes) => f
                .debug_tuple("Full")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
            Payload::Stream(_) => f.debug_tuple("Stream").field(&"<stream>").finish(),
        }
    }
}

/// An encoded request body with its wire content type
#[derive(Debug)]
pub struct EncodedBody {
    /// `Content-Type` to send; `None` leaves the caller's header untouched
    pub content_type: Option<String>,
    /// The payload itself
    pub payload: Payload,
}

/// Encode a request body for the wire
///
/// `accept` is the effective `Accept` header: a `Json` body encodes as CBOR
/// when the caller asked for `application/cbor` back, mirroring the
/// transparent decode on the response side.
pub async fn encode_request_body(body: &Body, accept: Option<&str>) -> Result<EncodedBody> {
    match body {
        Body::Bytes(data) => Ok(EncodedBody {
            content_type: None,
            payload: Payload::Full(data.clone()),
        }),
        Body::Form(pairs) => Ok(EncodedBody {
            content_type: Some("application/x-www-form-urlencoded".to_string()),
            payload: Payload::Full(Bytes::from(form::encode(pairs))),
        }),
        Body::Json(value) => {
            let wants_cbor = accept
                .map(|accept| accept.trim().eq_ignore_ascii_case("application/cbor"))
                .unwrap_or(false);
            if wants_cbor {
                Ok(EncodedBody {
                    content_type: Some("application/cbor".to_string()),
                    payload: Payload::Full(Bytes::from(cbor::encode(value)?)),
                })
            } else {
                Ok(EncodedBody {
                    content_type: Some("application/json".to_string()),
                    payload: Payload::Full(Bytes::from(serde_json::to_vec(value).map_err(
                        |e| httpr_errors::Error::LocalProtocol(format!("JSON encoding failed: {}", e)),
                    )?)),
                })
            }
        }
        Body::Cbor(value) => Ok(EncodedBody {
            content_type: Some("application/cbor".to_string()),
            payload: Payload::Full(Bytes::from(cbor::encode(value)?)),
        }),
        Body::Multipart(parts) => {
            let boundary = multipart::boundary();
            let stream = multipart::encode(parts, &boundary).await?;
            Ok(EncodedBody {
                content_type: Some(format!("multipart/form-data; boundary={}", boundary)),
                payload: Payload::Stream(stream),
            })
        }
    }
}
