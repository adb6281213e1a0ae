// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

/// Each Stream represents a duplex socket connection to a client.
///
/// Implementing the async I/O traits lets a channel split the stream into
/// read and write halves so a stalled peer cannot block inbound
/// processing.
#[derive(Debug)]
pub enum Stream {
    Mqtt(TcpStream),
    Mqtts(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Mqtt(tcp_stream) => Pin::new(tcp_stream).poll_read(cx, buf),
            Self::Mqtts(tls_stream) => Pin::new(tls_stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Mqtt(tcp_stream) => Pin::new(tcp_stream).poll_write(cx, buf),
            Self::Mqtts(tls_stream) => Pin::new(tls_stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Mqtt(tcp_stream) => Pin::new(tcp_stream).poll_flush(cx),
            Self::Mqtts(tls_stream) => Pin::new(tls_stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Mqtt(tcp_stream) => Pin::new(tcp_stream).poll_shutdown(cx),
            Self::Mqtts(tls_stream) => Pin::new(tls_stream.as_mut()).poll_shutdown(cx),
        }
    }
}
