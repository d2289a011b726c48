//! The capability set shared by every layer of the stack (spec §9 design
//! note): `Endpoint`, `Socket`, `Acceptor`, `Resolver`. Rather than
//! polymorphism through inheritance (the original's C++ templates), each
//! concrete layer (physical, TLS, circuit, fiber) implements these traits
//! directly and is generic over the layer below it where that layer
//! embeds one (`TlsSocket<Lower>`, `CircuitSocket<Lower>`, ...).

use async_trait::async_trait;
use ssf_error::Result;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::stack::ParameterStack;

/// A layer's endpoint pairs the endpoint of the layer below with this
/// layer's own context (spec §3). Endpoints are plain, cloneable,
/// inspectable values — never sockets.
pub trait Endpoint: Clone + std::fmt::Debug + Send + Sync + 'static {}
impl<T: Clone + std::fmt::Debug + Send + Sync + 'static> Endpoint for T {}

/// A stream-facility socket: the contract every stream layer exposes to
/// the layer above it. TLS, circuit, and fiber-stream sockets are all
/// `Socket`s over whatever they wrap.
pub trait Socket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Socket for T {}

/// Resolves the front frame of a [`ParameterStack`] into this layer's
/// endpoint, handing back the remaining stack for the layer above to
/// resolve in turn (ported from `basic_VirtualLink_resolver::resolve`).
#[async_trait]
pub trait Resolver {
    type Endpoint: Endpoint;

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint>;
}

/// An acceptor yields connected sockets of this layer, each produced by
/// accepting on the layer below and then driving this layer's server-side
/// handshake (spec §3: "ownership" invariant — the returned socket
/// exclusively owns everything below it).
#[async_trait]
pub trait Acceptor: Send {
    type Socket: Socket;
    type Endpoint: Endpoint;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)>;

    fn local_endpoint(&self) -> Self::Endpoint;
}

/// Overhead/facilities attributes attached to a physical protocol, mirrored
/// from `core/virtual_network/protocol_attributes.h`'s `overhead`/
/// `facilities` bitflags. Only `facilities` is load-bearing in this
/// implementation (selecting stream vs. datagram framing in the fiber
/// multiplexer); `overhead` is carried for documentation parity with the
/// original.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProtocolAttributes {
    pub mtu: usize,
    pub is_stream: bool,
}

pub const TCP_ATTRIBUTES: ProtocolAttributes = ProtocolAttributes {
    mtu: 65535,
    is_stream: true,
};

pub const UDP_ATTRIBUTES: ProtocolAttributes = ProtocolAttributes {
    mtu: 1500,
    is_stream: false,
};
