//! Turning a response body into bytes, text or parsed values.
//!
//! Every method here consumes the [`Response`]: a body is a readable-once
//! stream, and taking `self` by value is what stops two consumers from racing
//! for the same bytes. Callers that need several views of one body should read
//! it once with [`Response::bytes`] and work from the buffer.
//!
//! [`Response::parse`] is the single place where decoder failures are wrapped
//! into [`Error::Parse`] together with the text received so far.
mod mirror;
mod text;

use std::future::Future;

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::errors::{BoxError, Cancelled, Error, Result};
use crate::net::{BodyStream, Response};

pub use mirror::{Mirror, MirrorReader};
pub(crate) use text::TextAccumulator;

/// `AsyncRead` view of a response body.
pub type ContentReader = StreamReader<BodyStream, Bytes>;

impl Response {
    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Bytes> {
        Ok(crate::net::collect(self.into_stream()).await?)
    }

    /// Reads the whole body as UTF-8 text, replacing invalid sequences.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads at most `max_chars` characters of the body as UTF-8 text.
    ///
    /// Reading stops as soon as the budget is spent; the rest of the stream is
    /// never pulled from the transport.
    pub async fn text_limited(self, max_chars: usize) -> Result<String> {
        let mut acc = TextAccumulator::new(Some(max_chars));
        let mut stream = self.into_stream();

        while !acc.is_full() {
            match stream.next().await {
                Some(chunk) => {
                    acc.push(&chunk?);
                }
                None => break,
            }
        }

        Ok(acc.finish())
    }

    /// Raw body stream. Nothing else can read the body afterwards.
    pub fn into_stream(self) -> BodyStream {
        self.into_content().into_stream()
    }

    pub fn into_async_read(self) -> ContentReader {
        StreamReader::new(self.into_stream())
    }

    /// Runs `decode` over the body and wraps any failure with diagnostics.
    ///
    /// The decoder reads through a [`MirrorReader`] that keeps up to
    /// `mirror_limit` bytes of what it pulled. If the decoder fails, or `cancel`
    /// fires first, the result is an [`Error::Parse`] naming `parser`, carrying
    /// the decoder's error and the mirrored text.
    pub async fn parse<T, F, Fut, E>(
        self,
        parser: &'static str,
        mirror_limit: Option<usize>,
        cancel: &CancellationToken,
        decode: F,
    ) -> Result<T>
    where
        F: FnOnce(MirrorReader<ContentReader>, CancellationToken) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        let reader = MirrorReader::new(self.into_async_read(), mirror_limit);
        let mirror = reader.mirror();

        let outcome: std::result::Result<T, BoxError> = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Box::new(Cancelled)),
            res = decode(reader, cancel.clone()) => res.map_err(|e| e.into()),
        };

        outcome.map_err(|source| {
            log::debug!("{parser} parse failed after {} mirrored bytes: {source}", mirror.len());
            Error::Parse {
                parser,
                source,
                content: mirror.text(),
            }
        })
    }

    /// Starts buffering the body in the background and returns immediately.
    ///
    /// Does nothing outside a tokio runtime. Errors during the warm-up are not
    /// reported here; they surface from whichever call reads the body next.
    pub fn load_content(self) -> Self {
        if tokio::runtime::Handle::try_current().is_err() {
            log::debug!("no tokio runtime, skipping content warm-up");
            return self;
        }
        self.map_content(|content| content.preload())
    }

    /// Reads as much of the body as the stream delivers, stopping at the first error.
    pub(crate) async fn bytes_lossy(self) -> (Bytes, Option<std::io::Error>) {
        let mut buf = bytes::BytesMut::new();
        let mut stream = self.into_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(e) => return (buf.freeze(), Some(e)),
            }
        }
        (buf.freeze(), None)
    }
}
