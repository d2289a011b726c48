//! The two leaf layers: TCP and UDP (spec §4.1).

mod proxy_context;
pub mod tcp;
pub mod udp;

pub use proxy_context::ProxyContext;
pub use tcp::{TcpAcceptor, TcpEndpoint, TcpResolver, TcpSocket};
pub use udp::{UdpEndpoint, UdpResolver, UdpSocket};
