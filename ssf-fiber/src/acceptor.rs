//! The fiber acceptor and endpoint (spec §4.4.6, §3).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use ssf_error::Result;
use ssf_net::Acceptor;

use crate::id::HalfId;
use crate::shared::{IncomingFiber, Shared};
use crate::socket::FiberSocket;

/// A fiber endpoint pairs the endpoint of the layer below (typically
/// nothing observable — the multiplexer owns one link for its whole
/// lifetime, not one per fiber) with this fiber's own `HalfId` (spec §3).
#[derive(Copy, Clone, Debug)]
pub struct FiberEndpoint {
    pub local: HalfId,
    pub remote: HalfId,
}

impl FiberEndpoint {
    pub fn new(local: HalfId, remote: HalfId) -> Self {
        Self { local, remote }
    }
}

/// Suspends until an incoming `Open` control frame targets `local` (spec
/// §4.4.6). Dropping the acceptor unregisters `local`, freeing it for a
/// later `listen` call.
pub struct FiberAcceptor {
    shared: Arc<Shared>,
    local: HalfId,
    rx: mpsc::UnboundedReceiver<IncomingFiber>,
}

impl FiberAcceptor {
    pub(crate) fn new(shared: Arc<Shared>, local: HalfId, rx: mpsc::UnboundedReceiver<IncomingFiber>) -> Self {
        Self { shared, local, rx }
    }

    pub fn local_half(&self) -> HalfId {
        self.local
    }
}

#[async_trait]
impl Acceptor for FiberAcceptor {
    type Socket = FiberSocket;
    type Endpoint = FiberEndpoint;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)> {
        let incoming = self
            .rx
            .recv()
            .await
            .ok_or_else(|| ssf_error::Error::new(ssf_error::ErrorKind::OperationCanceled))?;

        let socket = FiberSocket::new(self.shared.clone(), incoming.full_id, incoming.data_rx);
        let endpoint = FiberEndpoint::new(incoming.full_id.right, incoming.full_id.left);
        Ok((socket, endpoint))
    }

    fn local_endpoint(&self) -> Self::Endpoint {
        FiberEndpoint::new(self.local, HalfId::default())
    }
}

impl Drop for FiberAcceptor {
    fn drop(&mut self) {
        self.shared.unregister_acceptor(self.local);
    }
}
