//! Fiber sockets: the stream facility (`FiberSocket`, plain
//! `AsyncRead`/`AsyncWrite`) and the datagram facility
//! (`FiberDatagramSocket`, message-boundary-preserving `send`/`recv`).
//! Both share the same underlying registration in [`Shared`] — only the
//! read-side framing differs (spec §3: "a fiber is one logical
//! bidirectional byte stream (or datagram channel)").

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

use ssf_error::Result;

use crate::frame::{FrameKind, MTU};
use crate::id::FullId;
use crate::shared::Shared;

type WriteFuture = Pin<Box<dyn Future<Output = Result<usize>> + Send>>;

/// One logical stream fiber (spec §3, §4.4.5). Bytes written are chunked
/// at [`MTU`] and sent as `Data` frames; `shutdown` sends the `Close`
/// control frame and marks the local half closed (spec §4.4.5's symmetric
/// close).
pub struct FiberSocket {
    shared: Arc<Shared>,
    full_id: FullId,
    data_rx: mpsc::Receiver<Vec<u8>>,
    recv_buf: BytesMut,
    write_fut: Option<WriteFuture>,
    shutdown_fut: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
}

impl FiberSocket {
    pub(crate) fn new(shared: Arc<Shared>, full_id: FullId, data_rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            shared,
            full_id,
            data_rx,
            recv_buf: BytesMut::new(),
            write_fut: None,
            shutdown_fut: None,
        }
    }

    pub fn full_id(&self) -> FullId {
        self.full_id
    }
}

impl AsyncRead for FiberSocket {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        if !self.recv_buf.is_empty() {
            let n = self.recv_buf.len().min(buf.remaining());
            buf.put_slice(&self.recv_buf[..n]);
            self.recv_buf.advance(n);
            return Poll::Ready(Ok(()));
        }

        match self.data_rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.recv_buf = BytesMut::from(&chunk[n..]);
                }
                Poll::Ready(Ok(()))
            }
            // Channel closed: either the peer's Close frame released our
            // sender, or the link itself failed. Either way, EOF.
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for FiberSocket {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        loop {
            if let Some(fut) = self.write_fut.as_mut() {
                let result = match fut.as_mut().poll(cx) {
                    Poll::Ready(r) => r,
                    Poll::Pending => return Poll::Pending,
                };
                self.write_fut = None;
                return Poll::Ready(result.map_err(std::io::Error::from));
            }

            let chunk_len = buf.len().min(MTU);
            let payload = buf[..chunk_len].to_vec();
            let shared = self.shared.clone();
            let full_id = self.full_id;
            self.write_fut = Some(Box::pin(async move {
                shared.send(FrameKind::Data, full_id, payload).await.map(|_| chunk_len)
            }));
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        if self.shutdown_fut.is_none() {
            let shared = self.shared.clone();
            let full_id = self.full_id;
            self.shutdown_fut = Some(Box::pin(async move {
                shared.mark_local_closed(full_id);
                shared.enqueue_fire_and_forget(FrameKind::Close, full_id, Vec::new());
            }));
        }
        let fut = self.shutdown_fut.as_mut().unwrap();
        match fut.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FiberSocket {
    fn drop(&mut self) {
        self.shared.mark_local_closed(self.full_id);
        self.shared.enqueue_fire_and_forget(FrameKind::Close, self.full_id, Vec::new());
    }
}

/// One logical datagram fiber: `send`/`recv` preserve the boundaries of
/// each call, unlike [`FiberSocket`]'s concatenated byte stream.
pub struct FiberDatagramSocket {
    shared: Arc<Shared>,
    full_id: FullId,
    data_rx: mpsc::Receiver<Vec<u8>>,
}

impl FiberDatagramSocket {
    pub(crate) fn new(shared: Arc<Shared>, full_id: FullId, data_rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            shared,
            full_id,
            data_rx,
        }
    }

    pub fn full_id(&self) -> FullId {
        self.full_id
    }

    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        self.shared
            .send(FrameKind::Data, self.full_id, payload.to_vec())
            .await?;
        Ok(())
    }

    /// Returns `None` once the fiber is closed (peer `Close` or link
    /// failure), the datagram analogue of `FiberSocket`'s read-side EOF.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.data_rx.recv().await
    }
}

impl Drop for FiberDatagramSocket {
    fn drop(&mut self) {
        self.shared.mark_local_closed(self.full_id);
        self.shared.enqueue_fire_and_forget(FrameKind::Close, self.full_id, Vec::new());
    }
}
