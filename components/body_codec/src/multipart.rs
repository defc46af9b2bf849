//! multipart/form-data assembly from file paths
//!
//! Each field is a file read from disk and streamed as one part; the whole
//! body is a lazy byte stream so large uploads never sit in memory.

use crate::ByteStream;
use bytes::Bytes;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use httpr_errors::{Error, Result};
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

/// Generate a fresh multipart boundary
pub fn boundary() -> String {
    format!("httpr-{}", uuid::Uuid::new_v4().simple())
}

/// Open every file and assemble the multipart body stream
///
/// Files are opened eagerly so a missing or unreadable path fails before
/// any bytes reach the wire.
pub async fn encode(parts: &[(String, PathBuf)], boundary: &str) -> Result<ByteStream> {
    let mut body: ByteStream = Box::pin(stream::empty());

    for (field, path) in parts {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            Error::Read(format!("cannot open upload file {}: {}", path.display(), e))
        })?;

        let head = part_head(boundary, field, path);
        let head_stream = stream::once(ready(Ok(Bytes::from(head))));
        let file_stream = ReaderStream::new(file);
        let part_end = stream::once(ready(Ok(Bytes::from_static(b"\r\n"))));

        body = Box::pin(body.chain(head_stream).chain(file_stream).chain(part_end));
    }

    let terminator = stream::once(ready(Ok(Bytes::from(format!("--{}--\r\n", boundary)))));
    Ok(Box::pin(body.chain(terminator)))
}

fn part_head(boundary: &str, field: &str, path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        boundary, field, filename, content_type
    )
}
