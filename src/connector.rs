//! The `tower::Service` glue between `hyper_util`'s legacy client and the
//! [`FingerprintingDialer`]. Every request goes to the single `remote_addr`/
//! `dial_addr` the engine was configured with, so the service ignores the
//! `Uri` hyper would otherwise route on — there is exactly one destination.

use std::{
    future::Future,
    io::{self, IoSlice},
    pin::Pin,
    task::{Context, Poll},
};

use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;

use crate::{dialer::FingerprintingDialer, error::BoxError};

#[derive(Clone)]
pub(crate) struct TunnelConnector {
    dialer: FingerprintingDialer,
}

impl TunnelConnector {
    pub(crate) fn new(dialer: FingerprintingDialer) -> Self {
        Self { dialer }
    }
}

pin_project_lite::pin_project! {
    /// Wraps the dialer's boxed connection so it can report itself
    /// `Connected` to hyper's pool bookkeeping.
    pub(crate) struct TunnelIo {
        #[pin]
        inner: TokioIo<crate::dialer::BoxedConn>,
    }
}

impl Connection for TunnelIo {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for TunnelIo {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: ReadBufCursor<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        Read::poll_read(this.inner, cx, buf)
    }
}

impl Write for TunnelIo {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.project();
        Write::poll_write(this.inner, cx, buf)
    }

    fn poll_write_vectored(self: Pin<&mut Self>, cx: &mut Context<'_>, bufs: &[IoSlice<'_>]) -> Poll<io::Result<usize>> {
        let this = self.project();
        Write::poll_write_vectored(this.inner, cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        Write::poll_flush(this.inner, cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        Write::poll_shutdown(this.inner, cx)
    }
}

impl tower_service::Service<http::Uri> for TunnelConnector {
    type Response = TunnelIo;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: http::Uri) -> Self::Future {
        let dialer = self.dialer.clone();
        Box::pin(async move {
            let conn = dialer.connect().await?;
            Ok(TunnelIo { inner: TokioIo::new(conn) })
        })
    }
}
