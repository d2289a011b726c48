//! The multiplexer itself: splits the link into independent read/write
//! halves, runs one reader task and one writer task for its whole
//! lifetime, and exposes `connect`/`listen` for fibers (spec §4.4).

use std::sync::Arc;

use ssf_error::{Error, ErrorKind, Result};
use ssf_net::Socket;
use tokio::io::{split, AsyncWriteExt};
use tracing::{debug, warn};

use crate::acceptor::FiberAcceptor;
use crate::congestion::CongestionPolicy;
use crate::frame::{self, FrameKind};
use crate::id::HalfId;
use crate::shared::Shared;
use crate::socket::{FiberDatagramSocket, FiberSocket};

/// One multiplexer per established link (spec §2: "one byte-stream -> N
/// fibers"). Cloning shares the same underlying link and fiber registry —
/// the type is a thin handle, like the original's `shared_ptr`-held
/// `basic_Multiplexer` (spec §9 "shared lifetime" note).
#[derive(Clone)]
pub struct Multiplexer {
    shared: Arc<Shared>,
}

impl Multiplexer {
    /// Takes ownership of an already-handshaked link socket (TLS, circuit,
    /// or raw TCP) and starts its reader/writer tasks. The link is owned
    /// solely by the multiplexer from this point on (spec §5).
    pub fn new<S>(link: S, congestion: Box<dyn CongestionPolicy>) -> Self
    where
        S: Socket,
    {
        let shared = Shared::new(congestion);
        let (read_half, write_half) = split(link);

        tokio::spawn(reader_loop(shared.clone(), read_half));
        tokio::spawn(writer_loop(shared.clone(), write_half));

        Self { shared }
    }

    /// Registers a listening acceptor for stream fibers bound to `local`
    /// (spec §4.4.6).
    pub fn listen(&self, local: HalfId) -> Result<FiberAcceptor> {
        let rx = self.shared.register_acceptor(local)?;
        Ok(FiberAcceptor::new(self.shared.clone(), local, rx))
    }

    /// Opens a stream fiber to `remote`, allocating a local half-id under
    /// `local_protocol` (spec §4.4.1, §4.4.6).
    pub async fn connect(&self, local_protocol: u8, remote: HalfId) -> Result<FiberSocket> {
        let (full_id, data_rx) = self.open_fiber(local_protocol, remote).await?;
        Ok(FiberSocket::new(self.shared.clone(), full_id, data_rx))
    }

    /// Same handshake as [`connect`](Self::connect), but yields a socket
    /// that preserves per-call datagram boundaries instead of a
    /// concatenated byte stream.
    pub async fn connect_datagram(&self, local_protocol: u8, remote: HalfId) -> Result<FiberDatagramSocket> {
        let (full_id, data_rx) = self.open_fiber(local_protocol, remote).await?;
        Ok(FiberDatagramSocket::new(self.shared.clone(), full_id, data_rx))
    }

    /// The handshake shared by both facilities (spec §4.4.6 "connect"):
    /// allocate a local half-id, send `Open`, and wait for the peer's
    /// `OpenAck`/`OpenRefused`.
    async fn open_fiber(
        &self,
        local_protocol: u8,
        remote: HalfId,
    ) -> Result<(crate::id::FullId, tokio::sync::mpsc::Receiver<Vec<u8>>)> {
        let (full_id, data_rx, ack_rx) = self.shared.begin_connect(local_protocol, remote)?;

        if let Err(e) = self.shared.enqueue(FrameKind::Open, full_id, Vec::new()) {
            self.shared.abort_connect(full_id);
            return Err(e);
        }

        match ack_rx.await {
            Ok(Ok(())) => Ok((full_id, data_rx)),
            Ok(Err(e)) => Err(e),
            Err(_canceled) => {
                self.shared.abort_connect(full_id);
                Err(Error::new(ErrorKind::OperationCanceled))
            }
        }
    }

    /// Cancels every pending and live fiber and stops accepting new sends
    /// (spec §5 "cancellation"). Idempotent.
    pub fn stop(&self) {
        self.shared.fail_all(ErrorKind::OperationCanceled);
    }
}

/// One send in flight at a time, draining `Shared`'s pending queue in
/// FIFO order (spec §4.4.3), ported from `basic_Multiplexer::StartPopping`
/// / `DatagramSent`. Runs for the multiplexer's whole lifetime rather than
/// being restarted per batch: waiting on `Notify` when the queue drains is
/// behaviorally identical to the original's `popping_` flag, without
/// needing to re-spawn a task every time the queue goes from empty to
/// non-empty.
async fn writer_loop<W>(shared: Arc<Shared>, mut write_half: W)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    loop {
        let pending = match shared.pop_pending() {
            Some(p) => p,
            None => {
                shared.notify.notified().await;
                continue;
            }
        };

        let result = frame::write_frame(&mut write_half, pending.kind, pending.full_id, &pending.payload)
            .await
            .map(|_| pending.payload.len());

        let failed = result.is_err();
        let _ = pending.completion.send(result);

        if failed {
            warn!("fiber multiplexer link write failed, stopping");
            shared.mark_write_failed();
            shared.fail_all(ErrorKind::BrokenPipe);
            let _ = write_half.shutdown().await;
            return;
        }
    }
}

/// Continuously reads one frame at a time and demultiplexes it (spec
/// §4.4.4), ported from the original's single-reader-task design
/// (`basic_Multiplexer` has no explicit read loop of its own in
/// `basic_multiplexer.h` — that lives in the fiber-protocol layer above
/// it — but the "one reader, dispatch by FullId" shape is the same one
/// `AsyncSendDatagram`/`AsyncReceiveDatagram` pairs drive there).
async fn reader_loop<R>(shared: Arc<Shared>, mut read_half: R)
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        match frame::read_frame(&mut read_half).await {
            Ok((kind, full_id, payload)) => {
                debug!(?kind, ?full_id, len = payload.len(), "fiber frame received");
                shared.dispatch(kind, full_id, payload).await;
            }
            Err(error) => {
                debug!(%error, "fiber multiplexer link read failed, stopping");
                shared.fail_all(ErrorKind::BrokenPipe);
                return;
            }
        }
    }
}
