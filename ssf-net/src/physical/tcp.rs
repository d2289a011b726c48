//! The TCP physical layer (spec §4.1). Overhead = 0, facilities = stream,
//! MTU = 65535.

use std::net::SocketAddr;

use async_trait::async_trait;
use ssf_error::{Error, ErrorKind, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use crate::layer::{Acceptor, Resolver, TCP_ATTRIBUTES};
use crate::stack::{get_field, ParameterStack};

pub use super::proxy_context::ProxyContext;

/// `addr`/`port` resolved from a layer's parameters, plus the proxy context
/// consulted by `connect` (spec §4.1's table of recognized keys).
#[derive(Clone, Debug)]
pub struct TcpEndpoint {
    /// `None` means "wildcard bind" — no `addr` key was present.
    pub addr: Option<String>,
    pub port: u16,
    pub proxy: ProxyContext,
}

impl TcpEndpoint {
    pub fn loopback(port: u16) -> Self {
        Self {
            addr: Some("127.0.0.1".to_string()),
            port,
            proxy: ProxyContext::none(),
        }
    }

    pub fn wildcard(port: u16) -> Self {
        Self {
            addr: None,
            port,
            proxy: ProxyContext::none(),
        }
    }

    async fn resolve_socket_addr(&self) -> Result<SocketAddr> {
        let host = self.addr.as_deref().unwrap_or("0.0.0.0");
        let target = format!("{host}:{}", self.port);
        tokio::net::lookup_host(&target)
            .await
            .map_err(|_| Error::new(ErrorKind::CannotResolveEndpoint))?
            .next()
            .ok_or_else(|| Error::new(ErrorKind::CannotResolveEndpoint))
    }
}

pub struct TcpResolver;

#[async_trait]
impl Resolver for TcpResolver {
    type Endpoint = TcpEndpoint;

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint> {
        resolve_tcp_like(stack)
    }
}

/// Shared by TCP and UDP: both recognize `addr`/`port` identically (spec
/// §4.1's table applies to the "physical layer", not just TCP).
pub(crate) fn resolve_tcp_like(stack: &mut ParameterStack) -> Result<TcpEndpoint> {
    let params = stack
        .pop_front()
        .ok_or_else(|| Error::new(ErrorKind::MissingConfigParameters))?;

    let addr = params.get("addr").cloned();
    let port = match params.get("port") {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| Error::new(ErrorKind::BadAddress))?,
        None => 0,
    };

    Ok(TcpEndpoint {
        addr,
        port,
        proxy: ProxyContext::none(),
    })
}

pub struct TcpSocket(pub(crate) TcpStream);

impl TcpSocket {
    /// Connects to `endpoint`, diverting through the proxy state machines
    /// of §4.5 when `endpoint.proxy.enabled` (spec §4.1 "Connect side
    /// effect").
    pub async fn connect(endpoint: &TcpEndpoint) -> Result<Self> {
        if endpoint.proxy.enabled {
            return Self::connect_via_proxy(endpoint).await;
        }

        let addr = endpoint.resolve_socket_addr().await?;
        debug!(%addr, "tcp connect");
        let stream = TcpStream::connect(addr).await?;
        Ok(Self(stream))
    }

    async fn connect_via_proxy(endpoint: &TcpEndpoint) -> Result<Self> {
        let host = endpoint
            .addr
            .clone()
            .ok_or_else(|| Error::new(ErrorKind::MissingConfigParameters))?;

        let stream = if let Some(http) = &endpoint.proxy.http_proxy {
            ssf_proxy::http_connect::connect(http, &host, endpoint.port).await?
        } else if let Some(socks) = &endpoint.proxy.socks_proxy {
            ssf_proxy::socks::connect(socks, &host, endpoint.port).await?
        } else {
            return Err(Error::new(ErrorKind::MissingConfigParameters));
        };

        Ok(Self(stream))
    }

    pub fn into_inner(self) -> TcpStream {
        self.0
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.0.local_addr()?)
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.0.peer_addr()?)
    }
}

impl tokio::io::AsyncRead for TcpSocket {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl tokio::io::AsyncWrite for TcpSocket {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::pin::Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.0).poll_shutdown(cx)
    }
}

pub struct TcpAcceptor {
    listener: TcpListener,
    endpoint: TcpEndpoint,
}

impl TcpAcceptor {
    pub async fn bind(endpoint: TcpEndpoint) -> Result<Self> {
        let addr = endpoint.resolve_socket_addr().await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AddrInUse => Error::new(ErrorKind::AddressInUse),
                _ => Error::from(e),
            })?;
        debug!(%addr, "tcp listen");
        Ok(Self { listener, endpoint })
    }

    pub fn protocol_attributes(&self) -> crate::layer::ProtocolAttributes {
        TCP_ATTRIBUTES
    }
}

#[async_trait]
impl Acceptor for TcpAcceptor {
    type Socket = TcpSocket;
    type Endpoint = TcpEndpoint;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)> {
        let (stream, peer) = self.listener.accept().await?;
        let endpoint = TcpEndpoint {
            addr: Some(peer.ip().to_string()),
            port: peer.port(),
            proxy: ProxyContext::none(),
        };
        Ok((TcpSocket(stream), endpoint))
    }

    fn local_endpoint(&self) -> Self::Endpoint {
        self.endpoint.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::LayerParameters;

    #[test]
    fn resolve_rejects_unparsable_port() {
        let mut params = LayerParameters::new();
        params.insert("addr".to_string(), "localhost".to_string());
        params.insert("port".to_string(), "not-a-port".to_string());
        let mut stack = ParameterStack::new();
        stack.push_back(params);

        let err = resolve_tcp_like(&mut stack).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadAddress);
    }

    #[test]
    fn resolve_without_addr_yields_wildcard() {
        let mut params = LayerParameters::new();
        params.insert("port".to_string(), "8011".to_string());
        let mut stack = ParameterStack::new();
        stack.push_back(params);

        let endpoint = resolve_tcp_like(&mut stack).unwrap();
        assert!(endpoint.addr.is_none());
        assert_eq!(endpoint.port, 8011);
    }

    #[tokio::test]
    async fn connect_to_closed_port_is_connection_refused() {
        let endpoint = TcpEndpoint::loopback(1);
        let err = TcpSocket::connect(&endpoint).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
    }
}
