//! Pass-through reader that keeps a copy of what was read.
//!
//! [`MirrorReader`] sits between a body stream and a decoder. Every byte the
//! decoder pulls is also appended to a shared [`Mirror`] (up to a limit), so
//! that when decoding fails the error can show exactly what was received. The
//! mirror handle outlives the reader: a decoder may consume or drop the reader
//! and the text read so far is still available.
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Shared shadow copy of the bytes read through a [`MirrorReader`].
#[derive(Debug, Clone)]
pub struct Mirror {
    buf: Arc<Mutex<Vec<u8>>>,
    limit: Option<usize>,
}

impl Mirror {
    fn new(limit: Option<usize>) -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::new())),
            limit,
        }
    }

    fn record(&self, bytes: &[u8]) {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        let take = match self.limit {
            Some(limit) => bytes.len().min(limit.saturating_sub(buf.len())),
            None => bytes.len(),
        };
        buf.extend_from_slice(&bytes[..take]);
    }

    /// Everything mirrored so far, decoded as UTF-8 with replacement characters.
    pub fn text(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Number of bytes mirrored so far.
    pub fn len(&self) -> usize {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MirrorReader<R> {
    inner: R,
    mirror: Mirror,
}

impl<R> MirrorReader<R> {
    /// Wraps `inner`, mirroring at most `limit` bytes (`None` mirrors everything).
    pub fn new(inner: R, limit: Option<usize>) -> Self {
        Self {
            inner,
            mirror: Mirror::new(limit),
        }
    }

    pub fn mirror(&self) -> Mirror {
        self.mirror.clone()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for MirrorReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();

        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = res {
            this.mirror.record(&buf.filled()[before..]);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn passes_bytes_through_and_mirrors_them() {
        let mut reader = MirrorReader::new(&b"{\"a\":1}"[..], None);
        let mirror = reader.mirror();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();

        assert_eq!(out, "{\"a\":1}");
        assert_eq!(mirror.text(), "{\"a\":1}");
        assert_eq!(mirror.len(), 7);
    }

    #[tokio::test]
    async fn limit_bounds_the_mirror_but_not_the_reader() {
        let mut reader = MirrorReader::new(&b"0123456789"[..], Some(4));
        let mirror = reader.mirror();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"0123456789");
        assert_eq!(mirror.text(), "0123");
    }

    #[tokio::test]
    async fn mirror_survives_dropped_reader() {
        let mut reader = MirrorReader::new(&b"partial body"[..], None);
        let mirror = reader.mirror();

        let mut head = [0u8; 7];
        reader.read_exact(&mut head).await.unwrap();
        drop(reader);

        assert_eq!(mirror.text(), "partial");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let mut reader = MirrorReader::new(&b"ok\xff\xfe!"[..], None);
        let mirror = reader.mirror();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(mirror.text(), "ok\u{FFFD}\u{FFFD}!");
        assert!(!mirror.is_empty());
    }
}
