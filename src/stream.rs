//! Session Stream and the duplex body plumbing that overlays a bidirectional
//! byte stream onto a single HTTP/2 request/response pair.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use http_body::Frame;
use http_body_util::{combinators::BoxBody, BodyExt, StreamBody};
use hyper::body::Incoming;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::{error::BoxError, instance::RequestBody};

/// Size of the in-memory pipe backing the outgoing request body. 64KiB
/// keeps a handful of proxied sessions resident without forcing every
/// small write onto its own HTTP/2 DATA frame.
const PIPE_CAPACITY: usize = 64 * 1024;

type ResponseReader = StreamReader<Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>, Bytes>;

/// Builds the in-memory pipe and its matching request `Body`: the write
/// half is handed back to the caller eventually (wrapped in
/// [`SessionStream`]), the read half becomes the streamed POST body.
pub(crate) fn duplex_body() -> (DuplexStream, RequestBody) {
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

    let frames = ReaderStream::new(reader).map(|chunk| chunk.map(Frame::data).map_err(BoxError::from));
    let body = StreamBody::new(frames).boxed();

    (writer, body)
}

/// Converts a response `Incoming` body into a plain `AsyncRead`, so reads
/// from [`SessionStream`] see raw tunneled bytes in server-send order.
fn response_reader(incoming: Incoming) -> ResponseReader {
    let data = http_body_util::BodyStream::new(incoming)
        .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
        .map_err(io::Error::other);
    StreamReader::new(Box::pin(data))
}

pin_project_lite::pin_project! {
    /// A duplex byte channel produced by `Dial`, backed by one HTTP/2
    /// request/response. Reads and writes may proceed independently and
    /// either half may close without affecting the other until
    /// [`SessionStream::close`] is called.
    pub struct SessionStream {
        #[pin]
        write_half: DuplexStream,
        #[pin]
        read_half: Option<ResponseReader>,
        closed: bool,
    }
}

impl SessionStream {
    pub(crate) fn new(write_half: DuplexStream, incoming: Incoming) -> Self {
        Self {
            write_half,
            read_half: Some(response_reader(incoming)),
            closed: false,
        }
    }

    /// Closes both halves of the stream: the response body reader (ending
    /// the inbound half) and, if not already shut down, the write half
    /// (signaling end-of-stream to the server). Calling this more than once
    /// has the same observable effect as calling it once — a shutdown error
    /// on an already-closed write half is swallowed internally rather than
    /// surfaced.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.read_half = None;
        let _ = self.write_half.shutdown().await;
    }
}

impl AsyncRead for SessionStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        match this.read_half.as_pin_mut() {
            Some(reader) => reader.poll_read(cx, buf),
            // Closed: behaves like a stream at EOF rather than erroring,
            // matching a response body that has already been fully drained.
            None => Poll::Ready(Ok(())),
        }
    }
}

impl AsyncWrite for SessionStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.project().write_half.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().write_half.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().write_half.poll_shutdown(cx)
    }
}

impl std::fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStream").field("closed", &self.closed).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn duplex_body_carries_writes_through_to_the_request_body_stream() {
        let (mut writer, body) = duplex_body();
        writer.write_all(b"ping").await.unwrap();
        writer.shutdown().await.unwrap();

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"ping");
    }

    #[tokio::test]
    async fn duplex_body_reflects_partial_writes_before_shutdown() {
        let (mut writer, body) = duplex_body();
        writer.write_all(b"partial").await.unwrap();
        // No shutdown: the body stream should still be readable for what
        // was written so far when read with a bounded read_exact.
        let mut reader = http_body_util::BodyStream::new(body);
        let frame = reader.next().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"partial"));
    }
}
