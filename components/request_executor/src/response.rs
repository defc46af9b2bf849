//! Response objects
//!
//! `Response` holds a fully materialised, content-decoded body.
//! `StreamingResponse` holds the open body channel plus its pooled
//! connection; iteration drives reads, and the lifecycle flags enforce
//! single-pass consumption.

use bytes::Bytes;
use futures::stream::Stream;
use http_body_util::BodyExt;
use httpr_codec::{LineDecoder, StreamDecoder, TextDecoder};
use httpr_errors::{Error, Result};
use httpr_transport::{map_hyper_error, PooledConnection};
use httpr_types::HeaderMap;
use hyper::body::Incoming;
use std::time::Duration;
use url::Url;

/// A buffered HTTP response
#[derive(Debug)]
pub struct Response {
    status_code: u16,
    reason: String,
    headers: HeaderMap,
    url: Url,
    history: Vec<Url>,
    content: Bytes,
}

impl Response {
    pub(crate) fn new(
        status_code: u16,
        reason: String,
        headers: HeaderMap,
        url: Url,
        history: Vec<Url>,
        content: Bytes,
    ) -> Self {
        Self {
            status_code,
            reason,
            headers,
            url,
            history,
            content,
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Canonical reason phrase for the status
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Case-insensitive response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL, after any redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URLs of the redirect hops that led here, oldest first
    pub fn history(&self) -> &[Url] {
        &self.history
    }

    /// Raw body bytes, with content encodings already removed
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Body decoded as text per the declared charset (UTF-8 default,
    /// invalid bytes replaced)
    pub fn text(&self) -> String {
        httpr_codec::decode_text(&self.content, self.headers.get("content-type"))
    }

    /// Structured body view
    ///
    /// Parses CBOR transparently when the response declares
    /// `Content-Type: application/cbor`, JSON otherwise.
    pub fn json(&self) -> Result<serde_json::Value> {
        httpr_codec::json_view(&self.content, self.headers.get("content-type"))
    }

    /// Structured body view that always parses CBOR
    pub fn cbor(&self) -> Result<serde_json::Value> {
        httpr_codec::cbor_view(&self.content)
    }

    /// Opt-in status check: 4xx/5xx becomes `Error::HttpStatus`
    pub fn raise_for_status(&self) -> Result<&Self> {
        if self.status_code >= 400 {
            return Err(Error::HttpStatus {
                status: self.status_code,
                url: self.url.to_string(),
            });
        }
        Ok(self)
    }
}

/// The open body half of a streaming response
struct BodyChannel {
    body: Incoming,
    conn: PooledConnection,
    decoder: Option<StreamDecoder>,
}

/// A response whose body is consumed lazily
///
/// Created after the response head arrives. Iteration is single-pass:
/// a consumed stream raises `StreamConsumed`, a closed one `StreamClosed`.
pub struct StreamingResponse {
    status_code: u16,
    reason: String,
    headers: HeaderMap,
    url: Url,
    history: Vec<Url>,
    idle_timeout: Duration,
    channel: Option<BodyChannel>,
    consumed: bool,
    closed: bool,
}

impl StreamingResponse {
    pub(crate) fn new(
        status_code: u16,
        reason: String,
        headers: HeaderMap,
        url: Url,
        history: Vec<Url>,
        idle_timeout: Duration,
        body: Incoming,
        conn: PooledConnection,
    ) -> Self {
        let decoder = StreamDecoder::new(headers.get("content-encoding"));
        Self {
            status_code,
            reason,
            headers,
            url,
            history,
            idle_timeout,
            channel: Some(BodyChannel {
                body,
                conn,
                decoder: Some(decoder),
            }),
            consumed: false,
            closed: false,
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Canonical reason phrase for the status
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Case-insensitive response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL, after any redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URLs of the redirect hops that led here, oldest first
    pub fn history(&self) -> &[Url] {
        &self.history
    }

    /// Whether the stream was closed (explicitly or by a failed read)
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the body was fully iterated
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Next decoded chunk; `Ok(None)` marks the end of the body
    ///
    /// # Errors
    ///
    /// `Error::StreamClosed` after [`StreamingResponse::close`],
    /// `Error::StreamConsumed` once the body has ended, and
    /// `Error::ReadTimeout` when the gap between chunks exceeds the idle
    /// timeout (the connection is then dropped, not reused).
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        if self.consumed {
            return Err(Error::StreamConsumed);
        }
        // Taken out for the duration of the read; put back only when more
        // body remains, so every error path drops the connection unclean
        let mut channel = match self.channel.take() {
            Some(channel) => channel,
            None => return Err(Error::StreamClosed),
        };

        loop {
            let frame = match tokio::time::timeout(self.idle_timeout, channel.body.frame()).await {
                Ok(frame) => frame,
                Err(_) => {
                    channel.conn.mark_broken();
                    self.closed = true;
                    return Err(Error::ReadTimeout(self.idle_timeout));
                }
            };

            match frame {
                None => {
                    let tail = match channel.decoder.take() {
                        Some(decoder) => match decoder.finish() {
                            Ok(tail) => tail,
                            Err(err) => {
                                self.closed = true;
                                return Err(err);
                            }
                        },
                        None => Bytes::new(),
                    };
                    channel.conn.release();
                    self.consumed = true;
                    if tail.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(tail));
                }
                Some(Err(err)) => {
                    channel.conn.mark_broken();
                    self.closed = true;
                    return Err(map_hyper_error("body read failed", err));
                }
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        // Trailers carry no body bytes
                        continue;
                    };
                    let decoded = match channel.decoder.as_mut() {
                        Some(decoder) => match decoder.push(&data) {
                            Ok(decoded) => decoded,
                            Err(err) => {
                                channel.conn.mark_broken();
                                self.closed = true;
                                return Err(err);
                            }
                        },
                        None => data,
                    };
                    if decoded.is_empty() {
                        continue;
                    }
                    self.channel = Some(channel);
                    return Ok(Some(decoded));
                }
            }
        }
    }

    /// Drain the remaining body and return it decoded
    pub async fn read(&mut self) -> Result<Bytes> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }

    /// Lazy sequence of decoded byte chunks
    pub fn iter_bytes(&mut self) -> impl Stream<Item = Result<Bytes>> + '_ {
        futures::stream::unfold((self, false), |(this, errored)| async move {
            if errored {
                return None;
            }
            match this.chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), (this, false))),
                Ok(None) => None,
                Err(err) => Some((Err(err), (this, true))),
            }
        })
    }

    /// Lazy sequence of text fragments decoded per the response charset
    pub fn iter_text(&mut self) -> impl Stream<Item = Result<String>> + '_ {
        let decoder = TextDecoder::new(self.headers.get("content-type"));
        futures::stream::unfold((self, Some(decoder)), |(this, mut decoder)| async move {
            loop {
                let mut active = decoder.take()?;
                match this.chunk().await {
                    Ok(Some(chunk)) => {
                        let text = active.push(&chunk);
                        decoder = Some(active);
                        if text.is_empty() {
                            // Chunk ended mid-sequence; keep reading
                            continue;
                        }
                        return Some((Ok(text), (this, decoder)));
                    }
                    Ok(None) => {
                        let tail = active.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (this, None)));
                    }
                    Err(err) => return Some((Err(err), (this, None))),
                }
            }
        })
    }

    /// Lazy sequence of lines, endings stripped
    pub fn iter_lines(&mut self) -> impl Stream<Item = Result<String>> + '_ {
        let text = TextDecoder::new(self.headers.get("content-type"));
        let lines = LineDecoder::new();
        futures::stream::unfold(
            (self, Some((text, lines)), Vec::<String>::new()),
            |(this, mut state, mut pending)| async move {
                loop {
                    if !pending.is_empty() {
                        let line = pending.remove(0);
                        return Some((Ok(line), (this, state, pending)));
                    }
                    let (mut text, mut lines) = state.take()?;
                    match this.chunk().await {
                        Ok(Some(chunk)) => {
                            pending = lines.push(&text.push(&chunk));
                            state = Some((text, lines));
                        }
                        Ok(None) => {
                            let mut rest = lines.push(&text.finish());
                            if let Some(last) = lines.finish() {
                                rest.push(last);
                            }
                            pending = rest;
                            if pending.is_empty() {
                                return None;
                            }
                        }
                        Err(err) => return Some((Err(err), (this, None, pending))),
                    }
                }
            },
        )
    }

    /// Freeze into a buffered response once the body is in hand
    pub(crate) fn into_buffered(&self, content: Bytes) -> Response {
        Response::new(
            self.status_code,
            self.reason.clone(),
            self.headers.detached(),
            self.url.clone(),
            self.history.clone(),
            content,
        )
    }

    /// Release the body channel
    ///
    /// A fully consumed connection was already returned to the pool; an
    /// abandoned one is discarded. Reading after close raises
    /// `Error::StreamClosed`.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.conn.mark_broken();
        }
        self.closed = true;
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status_code", &self.status_code)
            .field("url", &self.url.as_str())
            .field("is_closed", &self.closed)
            .field("is_consumed", &self.consumed)
            .finish()
    }
}

impl Drop for StreamingResponse {
    fn drop(&mut self) {
        self.close();
    }
}
