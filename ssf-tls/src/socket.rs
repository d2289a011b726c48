//! TLS sockets and acceptor (spec §4.2): thin wrappers around
//! `tokio_rustls::{server,client}::TlsStream`, which already implement
//! `AsyncRead`/`AsyncWrite` over any `Unpin` lower socket, so the types
//! below need no manual poll delegation — matching the teacher's "thin
//! wrapper" framing in `linkerd/tls/src/server/mod.rs`.

use async_trait::async_trait;
use tokio_rustls::{TlsAcceptor as RustlsAcceptor, TlsConnector};
use tracing::debug;

use ssf_error::{Error, ErrorKind, Result};
use ssf_net::{Acceptor, Endpoint, Socket};

use crate::config::{self, TlsParameters};
use crate::endpoint::TlsEndpoint;

/// The server-handshaked socket (invariant: only ever constructed after the
/// handshake completes, so no half-handshaked state is ever exposed).
pub type TlsServerSocket<T> = tokio_rustls::server::TlsStream<T>;

/// The client-handshaked socket, same invariant as above.
pub type TlsClientSocket<T> = tokio_rustls::client::TlsStream<T>;

/// Runs the client-side TLS handshake over an already-connected lower
/// socket and verifies the peer against `endpoint.params().ca_cert`.
pub async fn connect<T>(lower: T, endpoint: &TlsEndpoint<impl Endpoint>) -> Result<TlsClientSocket<T>>
where
    T: Socket,
{
    let config = config::client_config(endpoint.params())?;
    let connector = TlsConnector::from(config);

    // SSF's mutual-TLS trust model is "signed by the configured CA", not
    // hostname-based identity (there is no DNS behind a tunnel endpoint) --
    // the SNI name here is a fixed label rather than a peer address, so
    // certificates issued for this stack must carry it as a SAN entry.
    let domain = rustls::ServerName::try_from("ssf-peer")
        .map_err(|e| Error::with_source(ErrorKind::ImportCrtError, e))?;

    debug!("starting tls client handshake");
    connector
        .connect(domain, lower)
        .await
        .map_err(Error::from)
}

/// Accepts and runs the server-side TLS handshake over an already-accepted
/// lower socket.
pub async fn accept<T>(lower: T, params: &TlsParameters) -> Result<TlsServerSocket<T>>
where
    T: Socket,
{
    let config = config::server_config(params)?;
    let acceptor = RustlsAcceptor::from(config);

    debug!("starting tls server handshake");
    acceptor.accept(lower).await.map_err(Error::from)
}

/// Listens on the layer below, then drives the TLS server handshake on
/// every accepted connection before handing the socket to the caller.
pub struct TlsAcceptor<A: Acceptor> {
    lower: A,
    params: TlsParameters,
}

impl<A: Acceptor> TlsAcceptor<A> {
    pub fn new(lower: A, params: TlsParameters) -> Self {
        Self { lower, params }
    }
}

#[async_trait]
impl<A: Acceptor + Send> Acceptor for TlsAcceptor<A> {
    type Socket = TlsServerSocket<A::Socket>;
    type Endpoint = TlsEndpoint<A::Endpoint>;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)> {
        let (lower_socket, lower_endpoint) = self.lower.accept().await?;
        let socket = accept(lower_socket, &self.params).await?;
        Ok((socket, TlsEndpoint::new(lower_endpoint, self.params.clone())))
    }

    fn local_endpoint(&self) -> Self::Endpoint {
        TlsEndpoint::new(self.lower.local_endpoint(), self.params.clone())
    }
}
