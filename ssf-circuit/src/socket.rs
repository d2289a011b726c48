//! The circuit acceptor: accepts on the layer below, and for any
//! connection whose frame says `forward`, dials the next hop (decoded from
//! `circuit_nodes`) and splices the two streams for the remainder of the
//! connection (spec §4.3's "becomes a transparent byte stream"). Only
//! connections that terminate locally (`forward: "0"`) are ever handed up
//! to the layer above.

use async_trait::async_trait;
use tracing::warn;

use ssf_error::Result;
use ssf_net::{Acceptor, ParameterStack, Socket};

use crate::context::CircuitEndpointContext;
use crate::endpoint::CircuitEndpoint;
use crate::stack::write_stack_frame;

/// Dials the next hop described by a decoded [`ParameterStack`] — the
/// circuit layer doesn't know or care what's below it (TLS+TCP in the
/// common case), so forwarding is generic over whatever dialer the node
/// was configured with. A `dial` implementation is expected to resolve and
/// physically connect using the front of `stack` (its own layer frames),
/// then call [`connect`] with whatever remains so the next hop can read it
/// back with [`crate::stack::read_stack_frame`] (spec §4.3 step 2).
#[async_trait]
pub trait StackDialer: Send + Sync {
    type Socket: Socket;

    async fn dial(&self, stack: ParameterStack) -> Result<Self::Socket>;
}

/// Writes `remainder` onto an already-connected `lower` socket (spec §4.3
/// step 1) and hands the same socket back, now positioned for the layer
/// above (or the next circuit hop) to use. Called by the top-level client
/// against the first hop, and by every forwarding [`StackDialer`] against
/// the next one.
pub async fn connect<T: Socket>(mut lower: T, remainder: &ParameterStack) -> Result<T> {
    write_stack_frame(&mut lower, remainder).await?;
    Ok(lower)
}

pub struct CircuitAcceptor<A, D> {
    lower: A,
    dialer: D,
    local_id: String,
    forwarding: bool,
}

impl<A, D> CircuitAcceptor<A, D> {
    pub fn new(lower: A, dialer: D, local_id: String, forwarding: bool) -> Self {
        Self {
            lower,
            dialer,
            local_id,
            forwarding,
        }
    }
}

#[async_trait]
impl<A, D> Acceptor for CircuitAcceptor<A, D>
where
    A: Acceptor + Send,
    D: StackDialer + Send + Sync,
{
    type Socket = A::Socket;
    type Endpoint = CircuitEndpoint<A::Endpoint>;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)> {
        loop {
            let (mut socket, lower_endpoint) = self.lower.accept().await?;

            let mut remainder = crate::stack::read_stack_frame(&mut socket).await?;
            let context = CircuitEndpointContext::from_stack(&mut remainder);

            if !context.forward {
                return Ok((socket, CircuitEndpoint::new(lower_endpoint, context)));
            }

            match self.dialer.dial(remainder).await {
                Ok(mut upstream) => {
                    let _ = tokio::io::copy_bidirectional(&mut socket, &mut upstream).await;
                }
                Err(error) => {
                    warn!(%error, "circuit node failed to dial next hop");
                }
            }
            // The forwarded connection is fully consumed by the splice
            // above (or abandoned on dial failure); either way, go back
            // to accepting the next inbound connection.
        }
    }

    fn local_endpoint(&self) -> Self::Endpoint {
        CircuitEndpoint::new(
            self.lower.local_endpoint(),
            CircuitEndpointContext {
                forward: self.forwarding,
                id: self.local_id.clone(),
                forward_blocks: String::new(),
                details: String::new(),
            },
        )
    }
}
