//! The thin demo TCP-forwarder service (spec.md §1's "thin demonstration
//! service that opens fibers and moves bytes", SPEC_FULL.md §2): enough to
//! exercise the whole stack end to end without specifying a microservice
//! control-message wire format of its own.
//!
//! The well-known fiber half-id the forwarder binds on both ends isn't
//! named anywhere in spec.md (the real `stream_forwarder`/`stream_listener`
//! services aren't in the retrieved `original_source/` files either) —
//! `DEMO_HALF_ID` is this crate's own convention, not a wire contract
//! callers outside this binary should assume.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use ssf_error::{Error, Result};
use ssf_fiber::{HalfId, Multiplexer, PROTOCOL_STREAM};

pub const DEMO_HALF_ID: HalfId = HalfId::new(PROTOCOL_STREAM, 1);

/// Server side: accepts forwarded fibers on `local` and splices each into
/// a fresh TCP connection to `target` (spec §8 scenario 1's "echo service
/// listening on the server side").
pub async fn run_server_forwarder(mux: Multiplexer, local: HalfId, target: SocketAddr) -> Result<()> {
    let mut acceptor = mux.listen(local)?;

    loop {
        let (mut fiber, endpoint) = acceptor.accept().await?;
        debug!(?endpoint, %target, "accepted forwarded fiber");

        tokio::spawn(async move {
            match TcpStream::connect(target).await {
                Ok(mut tcp) => {
                    if let Err(error) = tokio::io::copy_bidirectional(&mut fiber, &mut tcp).await {
                        debug!(%error, "forwarded connection closed");
                    }
                }
                Err(error) => warn!(%error, %target, "demo forwarder could not dial target"),
            }
        });
    }
}

/// Client side: listens on `listen` and opens one fiber to `remote` per
/// accepted connection, splicing the two (spec §8 scenario 1's "local
/// listener forwarded through the tunnel").
pub async fn run_client_forwarder(mux: Multiplexer, listen: SocketAddr, remote: HalfId) -> Result<()> {
    let listener = TcpListener::bind(listen).await.map_err(Error::from)?;
    run_client_forwarder_on(listener, mux, remote).await
}

/// Same as [`run_client_forwarder`], but over an already-bound listener —
/// lets a caller (or a test) learn the ephemeral port before the accept
/// loop starts.
pub async fn run_client_forwarder_on(listener: TcpListener, mux: Multiplexer, remote: HalfId) -> Result<()> {
    debug!(local = ?listener.local_addr(), "demo forwarder listening");

    loop {
        let (mut tcp, peer) = listener.accept().await.map_err(Error::from)?;
        let mux = mux.clone();
        debug!(%peer, "accepted local connection for forwarding");

        tokio::spawn(async move {
            match mux.connect(PROTOCOL_STREAM, remote).await {
                Ok(mut fiber) => {
                    if let Err(error) = tokio::io::copy_bidirectional(&mut fiber, &mut tcp).await {
                        debug!(%error, "forwarded connection closed");
                    }
                }
                Err(error) => warn!(%error, "demo forwarder could not open fiber"),
            }
        });
    }
}
