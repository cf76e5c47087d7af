//! Readable-once response content.
//!
//! A [`Content`] owns the body of exactly one response. It is either still
//! streaming from the transport, or being preloaded into memory by a
//! background task (see [`Response::load_content`](crate::Response::load_content)).
//! Either way it can be turned into a [`BodyStream`] once; there is no way to
//! rewind it.
use std::fmt::Debug;
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;
use tokio::task::JoinHandle;

/// Raw byte stream of a response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

enum Body {
    Streaming(BodyStream),
    Preloading(JoinHandle<io::Result<Bytes>>),
}

pub struct Content {
    body: Body,
    content_type: Option<String>,
    content_length: Option<u64>,
}

impl Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("preloading", &self.is_preloading())
            .finish_non_exhaustive()
    }
}

impl Content {
    /// Content backed by a (possibly endless) stream of chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Body::Streaming(Box::pin(stream)),
            content_type: None,
            content_length: None,
        }
    }

    /// Content already held in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        let mut content = Self::from_stream(futures::stream::once(async move { Ok(bytes) }));
        content.content_length = Some(len);
        content
    }

    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Fills content-type and content-length from the response headers. Header
    /// values win over lengths derived from in-memory bodies.
    pub(crate) fn with_metadata(mut self, headers: &HeaderMap) -> Self {
        if let Some(ct) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            self.content_type = Some(ct.to_string());
        }
        if let Some(len) = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.content_length = Some(len);
        }
        self
    }

    /// Declared content type, if the response carried a readable one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared (or known) body length in bytes.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// True while a background warm-up owns the stream.
    pub fn is_preloading(&self) -> bool {
        matches!(self.body, Body::Preloading(_))
    }

    /// Hands the content to a background task that buffers it into memory.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn preload(self) -> Self {
        let Content { body, content_type, content_length } = self;

        let body = match body {
            Body::Streaming(stream) => Body::Preloading(tokio::spawn(async move {
                let bytes = collect(stream).await;
                if let Err(e) = &bytes {
                    log::debug!("content warm-up failed, deferring error to the reader: {e}");
                }
                bytes
            })),
            preloading => preloading,
        };

        Self { body, content_type, content_length }
    }

    /// Consumes the content, yielding its byte stream.
    ///
    /// Preloaded content is yielded as a single chunk once the warm-up finishes;
    /// a failed warm-up surfaces its error here.
    pub fn into_stream(self) -> BodyStream {
        match self.body {
            Body::Streaming(stream) => stream,
            Body::Preloading(handle) => Box::pin(futures::stream::once(async move {
                match handle.await {
                    Ok(bytes) => bytes,
                    Err(join) => Err(io::Error::other(join)),
                }
            })),
        }
    }
}

/// Reads a stream to completion.
pub(crate) async fn collect(mut stream: BodyStream) -> io::Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn chunks(parts: Vec<io::Result<&'static str>>) -> Content {
        Content::from_stream(futures::stream::iter(
            parts.into_iter().map(|p| p.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn from_bytes_knows_its_length() {
        let content = Content::from_bytes("hello");
        assert_eq!(content.content_length(), Some(5));
        assert_eq!(collect(content.into_stream()).await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn metadata_comes_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));

        let content = Content::from_bytes("{}").with_metadata(&headers);
        assert_eq!(content.content_type(), Some("application/json"));
        assert_eq!(content.content_length(), Some(42));
    }

    #[test]
    fn malformed_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_bytes(b"text/\xffplain").unwrap());
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));

        let content = Content::empty().with_metadata(&headers);
        assert_eq!(content.content_type(), None);
        assert_eq!(content.content_length(), Some(0));
    }

    #[tokio::test]
    async fn preload_buffers_in_background() {
        let content = chunks(vec![Ok("ab"), Ok("cd")]).preload();
        assert!(content.is_preloading());
        assert_eq!(collect(content.into_stream()).await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn preload_failure_surfaces_on_read() {
        let content = chunks(vec![Ok("ab"), Err(io::Error::other("reset"))]).preload();
        let err = collect(content.into_stream()).await.unwrap_err();
        assert_eq!(err.to_string(), "reset");
    }
}
