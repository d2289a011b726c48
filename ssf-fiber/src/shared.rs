//! Multiplexer state shared between the reader task, the writer task, and
//! every live fiber socket (spec §4.4.3, §4.4.4, §5).
//!
//! All of it sits behind one regular (non-reentrant) `std::sync::Mutex`,
//! per the rewrite note in spec §9: the original's recursive mutex exists
//! only because its completion handlers run inline while the lock is
//! held. Here, nothing is ever invoked while a guard is live — a cloned
//! sender or a value pulled out of a map is all any critical section
//! produces, and the actual notification (a channel send, a oneshot
//! resolve) happens after the guard drops.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, Notify};

use ssf_error::{Error, ErrorKind, Result};

use crate::congestion::CongestionPolicy;
use crate::frame::FrameKind;
use crate::id::{FullId, HalfId};

/// Fiber receive-queue depth: bounds how far the single reader task can
/// run ahead of a slow fiber consumer (spec §4.4.4's back-pressure note).
pub(crate) const DATA_CHANNEL_CAPACITY: usize = 64;

pub(crate) struct PendingSend {
    pub kind: FrameKind,
    pub full_id: FullId,
    pub payload: Vec<u8>,
    pub completion: oneshot::Sender<Result<usize>>,
}

/// A freshly opened fiber handed from the reader task to a waiting
/// `accept()` call.
pub(crate) struct IncomingFiber {
    pub full_id: FullId,
    pub data_rx: mpsc::Receiver<Vec<u8>>,
}

struct FiberHandle {
    data_tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    local_closed: AtomicBool,
    remote_closed: AtomicBool,
}

impl FiberHandle {
    fn new(data_tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            data_tx: Mutex::new(Some(data_tx)),
            local_closed: AtomicBool::new(false),
            remote_closed: AtomicBool::new(false),
        }
    }
}

#[derive(Default)]
struct Registry {
    fibers: HashMap<FullId, Arc<FiberHandle>>,
    pending_connects: HashMap<FullId, oneshot::Sender<Result<()>>>,
    acceptors: HashMap<HalfId, mpsc::UnboundedSender<IncomingFiber>>,
}

pub(crate) struct Shared {
    registry: Mutex<Registry>,
    queue: Mutex<std::collections::VecDeque<PendingSend>>,
    pub(crate) notify: Notify,
    ready: AtomicBool,
    congestion: Box<dyn CongestionPolicy>,
}

impl Shared {
    pub(crate) fn new(congestion: Box<dyn CongestionPolicy>) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            queue: Mutex::new(std::collections::VecDeque::new()),
            notify: Notify::new(),
            ready: AtomicBool::new(true),
            congestion,
        })
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn pop_pending(&self) -> Option<PendingSend> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Enqueues a frame for the writer task, failing synchronously (spec
    /// §4.4.3's congestion-policy step and §8's "rejects further Sends
    /// synchronously once ready==false").
    pub(crate) fn enqueue(
        &self,
        kind: FrameKind,
        full_id: FullId,
        payload: Vec<u8>,
    ) -> Result<oneshot::Receiver<Result<usize>>> {
        if !self.is_ready() {
            return Err(Error::new(ErrorKind::NotConnected));
        }

        let mut queue = self.queue.lock().unwrap();
        if !self.congestion.is_addable(queue.len(), payload.len()) {
            return Err(Error::new(ErrorKind::NoBufferSpace));
        }

        let (tx, rx) = oneshot::channel();
        queue.push_back(PendingSend {
            kind,
            full_id,
            payload,
            completion: tx,
        });
        drop(queue);
        self.notify.notify_one();
        Ok(rx)
    }

    pub(crate) async fn send(&self, kind: FrameKind, full_id: FullId, payload: Vec<u8>) -> Result<usize> {
        let rx = self.enqueue(kind, full_id, payload)?;
        rx.await.map_err(|_| Error::new(ErrorKind::OperationCanceled))?
    }

    /// Used for control frames (OpenAck/OpenRefused/Close) where the
    /// caller doesn't need to await the wire write completing — only
    /// that it was handed to the send loop.
    pub(crate) fn enqueue_fire_and_forget(&self, kind: FrameKind, full_id: FullId, payload: Vec<u8>) {
        if let Err(error) = self.enqueue(kind, full_id, payload) {
            tracing::debug!(?kind, %error, "fiber control frame dropped");
        }
    }

    /// Called by the writer task once a send completes or fails. On
    /// failure the multiplexer stops accepting new sends (spec §4.4.3).
    pub(crate) fn mark_write_failed(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    fn allocate_half(reg: &Registry, protocol: u8, remote: HalfId) -> Result<HalfId> {
        for port in 1..=u16::MAX {
            let candidate = HalfId::new(protocol, port);
            if !reg.fibers.contains_key(&FullId::new(candidate, remote)) {
                return Ok(candidate);
            }
        }
        Err(Error::new(ErrorKind::NoBufferSpace))
    }

    /// Allocates a local half-id (spec §4.4.1), registers the fiber and a
    /// pending-connect slot, and returns the receive channel plus the
    /// oneshot resolved when the peer's open-ack (or refusal) arrives.
    pub(crate) fn begin_connect(
        &self,
        local_protocol: u8,
        remote: HalfId,
    ) -> Result<(FullId, mpsc::Receiver<Vec<u8>>, oneshot::Receiver<Result<()>>)> {
        let mut reg = self.registry.lock().unwrap();
        let local = Self::allocate_half(&reg, local_protocol, remote)?;
        let full_id = FullId::new(local, remote);

        let (data_tx, data_rx) = mpsc::channel(DATA_CHANNEL_CAPACITY);
        reg.fibers.insert(full_id, Arc::new(FiberHandle::new(data_tx)));

        let (ack_tx, ack_rx) = oneshot::channel();
        reg.pending_connects.insert(full_id, ack_tx);

        Ok((full_id, data_rx, ack_rx))
    }

    /// Aborts a connect that never reached an ack (e.g. the caller gave
    /// up waiting), tearing down the speculative fiber entry.
    pub(crate) fn abort_connect(&self, full_id: FullId) {
        let mut reg = self.registry.lock().unwrap();
        reg.fibers.remove(&full_id);
        reg.pending_connects.remove(&full_id);
    }

    pub(crate) fn register_acceptor(&self, local: HalfId) -> Result<mpsc::UnboundedReceiver<IncomingFiber>> {
        let mut reg = self.registry.lock().unwrap();
        if reg.acceptors.contains_key(&local) {
            return Err(Error::new(ErrorKind::AddressInUse));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        reg.acceptors.insert(local, tx);
        Ok(rx)
    }

    pub(crate) fn unregister_acceptor(&self, local: HalfId) {
        self.registry.lock().unwrap().acceptors.remove(&local);
    }

    pub(crate) fn mark_local_closed(&self, full_id: FullId) {
        let mut reg = self.registry.lock().unwrap();
        let release = match reg.fibers.get(&full_id) {
            Some(handle) => {
                handle.local_closed.store(true, Ordering::SeqCst);
                handle.remote_closed.load(Ordering::SeqCst)
            }
            None => false,
        };
        if release {
            reg.fibers.remove(&full_id);
        }
    }

    /// Dispatches one frame received off the link (spec §4.4.4).
    pub(crate) async fn dispatch(self: &Arc<Self>, kind: FrameKind, full_id: FullId, payload: Vec<u8>) {
        match kind {
            FrameKind::Open => self.handle_open(full_id).await,
            FrameKind::OpenAck => self.handle_open_ack(full_id),
            FrameKind::OpenRefused => self.handle_open_refused(full_id),
            FrameKind::Data => self.handle_data(full_id, payload).await,
            FrameKind::Close => self.handle_close(full_id),
        }
    }

    async fn handle_open(self: &Arc<Self>, full_id: FullId) {
        let acceptor_tx = {
            let reg = self.registry.lock().unwrap();
            reg.acceptors.get(&full_id.right).cloned()
        };
        let Some(acceptor_tx) = acceptor_tx else {
            self.enqueue_fire_and_forget(FrameKind::OpenRefused, full_id, Vec::new());
            return;
        };

        let (data_tx, data_rx) = mpsc::channel(DATA_CHANNEL_CAPACITY);
        {
            let mut reg = self.registry.lock().unwrap();
            if reg.fibers.contains_key(&full_id) {
                // Spec §3: "at most one fiber per FiberId at a time".
                drop(reg);
                self.enqueue_fire_and_forget(FrameKind::OpenRefused, full_id, Vec::new());
                return;
            }
            reg.fibers.insert(full_id, Arc::new(FiberHandle::new(data_tx)));
        }

        if acceptor_tx.send(IncomingFiber { full_id, data_rx }).is_err() {
            self.registry.lock().unwrap().fibers.remove(&full_id);
            self.enqueue_fire_and_forget(FrameKind::OpenRefused, full_id, Vec::new());
            return;
        }

        self.enqueue_fire_and_forget(FrameKind::OpenAck, full_id, Vec::new());
    }

    fn handle_open_ack(&self, full_id: FullId) {
        if let Some(tx) = self.registry.lock().unwrap().pending_connects.remove(&full_id) {
            let _ = tx.send(Ok(()));
        }
    }

    fn handle_open_refused(&self, full_id: FullId) {
        let mut reg = self.registry.lock().unwrap();
        reg.fibers.remove(&full_id);
        let pending = reg.pending_connects.remove(&full_id);
        drop(reg);
        if let Some(tx) = pending {
            let _ = tx.send(Err(Error::new(ErrorKind::ConnectionRefused)));
        }
    }

    async fn handle_data(&self, full_id: FullId, payload: Vec<u8>) {
        let tx = {
            let reg = self.registry.lock().unwrap();
            reg.fibers
                .get(&full_id)
                .and_then(|h| h.data_tx.lock().unwrap().clone())
        };
        if let Some(tx) = tx {
            // Applies back-pressure to the single reader task when the
            // fiber's consumer falls behind (spec §4.4.4).
            let _ = tx.send(payload).await;
        }
        // No live fiber for this FullId: dropped (spec §4.4.4).
    }

    fn handle_close(&self, full_id: FullId) {
        let mut reg = self.registry.lock().unwrap();
        let release = match reg.fibers.get(&full_id) {
            Some(handle) => {
                handle.remote_closed.store(true, Ordering::SeqCst);
                *handle.data_tx.lock().unwrap() = None;
                handle.local_closed.load(Ordering::SeqCst)
            }
            None => false,
        };
        if release {
            reg.fibers.remove(&full_id);
        }
    }

    /// Invoked once the link itself dies (read or write error): every
    /// live fiber surfaces EOF/error, every pending connect fails, and
    /// further sends are rejected synchronously.
    pub(crate) fn fail_all(&self, kind: ErrorKind) {
        self.ready.store(false, Ordering::SeqCst);
        let mut reg = self.registry.lock().unwrap();
        for (_, handle) in reg.fibers.drain() {
            *handle.data_tx.lock().unwrap() = None;
        }
        for (_, tx) in reg.pending_connects.drain() {
            let _ = tx.send(Err(Error::new(kind)));
        }
        let mut queue = self.queue.lock().unwrap();
        while let Some(pending) = queue.pop_front() {
            let _ = pending.completion.send(Err(Error::new(kind)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::BoundedQueuePolicy;

    #[test]
    fn allocate_half_picks_first_free_port() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::default()));
        let remote = HalfId::new(6, 22);
        let (full_id, _rx, _ack) = shared.begin_connect(6, remote).unwrap();
        assert_eq!(full_id.left.port, 1);
        assert_eq!(full_id.right, remote);
    }

    #[test]
    fn allocate_half_skips_ports_already_in_use_against_the_same_remote() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::default()));
        let remote = HalfId::new(6, 22);
        let (first, _rx1, _ack1) = shared.begin_connect(6, remote).unwrap();
        let (second, _rx2, _ack2) = shared.begin_connect(6, remote).unwrap();
        assert_ne!(first.left.port, second.left.port);
    }

    #[test]
    fn ready_false_rejects_enqueue_synchronously() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::default()));
        shared.fail_all(ErrorKind::BrokenPipe);
        let err = shared
            .enqueue(FrameKind::Data, FullId::new(HalfId::new(6, 1), HalfId::new(6, 2)), Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn congestion_policy_rejects_past_threshold() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::new(1)));
        let full_id = FullId::new(HalfId::new(6, 1), HalfId::new(6, 2));
        assert!(shared.enqueue(FrameKind::Data, full_id, vec![0]).is_ok());
        let err = shared.enqueue(FrameKind::Data, full_id, vec![0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoBufferSpace);
    }

    /// Spec §8: "two concurrent Sends ... completion handlers are invoked
    /// in call order." Drains the queue by hand (no real writer task) to
    /// pin down ordering independent of any I/O timing.
    #[tokio::test]
    async fn completions_resolve_in_enqueue_order() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::default()));
        let full_id = FullId::new(HalfId::new(6, 1), HalfId::new(6, 2));

        let rx1 = shared.enqueue(FrameKind::Data, full_id, vec![1]).unwrap();
        let rx2 = shared.enqueue(FrameKind::Data, full_id, vec![2]).unwrap();
        let rx3 = shared.enqueue(FrameKind::Data, full_id, vec![3]).unwrap();

        let mut drained = Vec::new();
        while let Some(pending) = shared.pop_pending() {
            drained.push(pending.payload.clone());
            let _ = pending.completion.send(Ok(pending.payload.len()));
        }
        assert_eq!(drained, vec![vec![1], vec![2], vec![3]]);

        assert_eq!(rx1.await.unwrap().unwrap(), 1);
        assert_eq!(rx2.await.unwrap().unwrap(), 1);
        assert_eq!(rx3.await.unwrap().unwrap(), 1);
    }

    /// Once the queue back-pressures a caller with `no_buffer_space`,
    /// draining it (as the writer task does) makes room again and FIFO
    /// order is preserved for what was already queued (spec §8 scenario
    /// 6).
    #[test]
    fn drained_queue_admits_new_sends_in_fifo_order() {
        let shared = Shared::new(Box::new(BoundedQueuePolicy::new(2)));
        let full_id = FullId::new(HalfId::new(6, 1), HalfId::new(6, 2));

        let _rx1 = shared.enqueue(FrameKind::Data, full_id, vec![1]).unwrap();
        let _rx2 = shared.enqueue(FrameKind::Data, full_id, vec![2]).unwrap();
        assert_eq!(shared.enqueue(FrameKind::Data, full_id, vec![3]).unwrap_err().kind(), ErrorKind::NoBufferSpace);

        let drained = shared.pop_pending().unwrap();
        assert_eq!(drained.payload, vec![1]);

        let rx3 = shared.enqueue(FrameKind::Data, full_id, vec![3]).unwrap();
        assert_eq!(shared.pop_pending().unwrap().payload, vec![2]);
        assert_eq!(shared.pop_pending().unwrap().payload, vec![3]);
        drop(rx3);
    }
}
