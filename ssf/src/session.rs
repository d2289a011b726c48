//! Establishes the Physical + TLS + Fiber stack for one tunnel endpoint
//! (SPEC_FULL.md §2's layering, minus the circuit hop — a node wanting
//! circuit traversal composes `ssf-circuit`'s acceptor/dialer directly,
//! the way `tests/circuit_hop.rs` does, rather than through this binary's
//! single-hop convenience wiring).

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use ssf_error::{Error, Result};
use ssf_fiber::{BoundedQueuePolicy, Multiplexer};
use ssf_tls::TlsParameters;

use crate::forwarder;

/// Server side: accepts tunnel connections on `listen` forever, and for
/// each one starts a multiplexer plus the demo forwarder dialing `target`.
pub async fn serve(listen: SocketAddr, tls: TlsParameters, target: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await.map_err(Error::from)?;
    info!(%listen, "tunnel server listening");

    loop {
        let (tcp, peer) = listener.accept().await.map_err(Error::from)?;
        let tls = tls.clone();

        tokio::spawn(async move {
            info!(%peer, "tunnel client connected");
            let tls_socket = match ssf_tls::accept(tcp, &tls).await {
                Ok(socket) => socket,
                Err(error) => {
                    warn!(%error, %peer, "tls handshake failed");
                    return;
                }
            };

            let mux = Multiplexer::new(tls_socket, Box::new(BoundedQueuePolicy::default()));
            if let Err(error) = forwarder::run_server_forwarder(mux, forwarder::DEMO_HALF_ID, target).await {
                warn!(%error, %peer, "tunnel session ended");
            }
        });
    }
}

/// Client side: connects the tunnel once and runs the demo forwarder,
/// listening locally on `listen` and opening one fiber per accepted
/// connection to the server's `DEMO_HALF_ID`.
pub async fn connect(server: SocketAddr, tls: TlsParameters, listen: SocketAddr) -> Result<()> {
    let tcp = TcpStream::connect(server).await.map_err(Error::from)?;
    let endpoint = ssf_tls::TlsEndpoint::new((), tls);
    let tls_socket = ssf_tls::connect(tcp, &endpoint).await?;

    let mux = Multiplexer::new(tls_socket, Box::new(BoundedQueuePolicy::default()));
    forwarder::run_client_forwarder(mux, listen, forwarder::DEMO_HALF_ID).await
}
