//! The UDP physical layer (spec §4.1). Overhead = 0, facilities = datagram,
//! MTU = 1500.

use std::net::SocketAddr;

use async_trait::async_trait;
use ssf_error::{Error, ErrorKind, Result};
use tokio::net::UdpSocket as TokioUdpSocket;

use crate::layer::{Resolver, UDP_ATTRIBUTES};
use crate::stack::ParameterStack;

pub use super::tcp::TcpEndpoint as UdpEndpoint;

pub struct UdpResolver;

#[async_trait]
impl Resolver for UdpResolver {
    type Endpoint = UdpEndpoint;

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint> {
        super::tcp::resolve_tcp_like(stack)
    }
}

pub struct UdpSocket(TokioUdpSocket);

impl UdpSocket {
    pub async fn bind(endpoint: &UdpEndpoint) -> Result<Self> {
        let host = endpoint.addr.as_deref().unwrap_or("0.0.0.0");
        let addr = format!("{host}:{}", endpoint.port);
        let socket = TokioUdpSocket::bind(&addr)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AddrInUse => Error::new(ErrorKind::AddressInUse),
                _ => Error::from(e),
            })?;
        Ok(Self(socket))
    }

    pub async fn connect(&self, peer: SocketAddr) -> Result<()> {
        self.0.connect(peer).await?;
        Ok(())
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        if buf.len() > UDP_ATTRIBUTES.mtu {
            return Err(Error::new(ErrorKind::MessageTooLong));
        }
        Ok(self.0.send(buf).await?)
    }

    pub async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        if buf.len() > UDP_ATTRIBUTES.mtu {
            return Err(Error::new(ErrorKind::MessageTooLong));
        }
        Ok(self.0.send_to(buf, dest).await?)
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.0.recv(buf).await?)
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.0.recv_from(buf).await?)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.0.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_above_mtu_is_message_too_long() {
        let endpoint = UdpEndpoint::wildcard(0);
        let socket = UdpSocket::bind(&endpoint).await.unwrap();
        socket.connect("127.0.0.1:1".parse().unwrap()).await.unwrap();
        let buf = vec![0u8; UDP_ATTRIBUTES.mtu + 1];
        let err = socket.send(&buf).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MessageTooLong);
    }
}
