//! Spec §8 scenario 2, "one circuit hop": a client dials a relay node,
//! which forwards the connection one hop further to a destination node
//! that terminates the circuit and runs the same TLS+fiber tunnel as
//! `loopback_tunnel.rs`. The relay itself is plain TCP (no TLS) — the
//! circuit layer forwards bytes regardless of what's underneath, and a
//! bare TCP relay keeps this test's topology small. A forwarded port
//! through the hop functions identically to the no-hop case: the same
//! `PING\n` round-trips end to end.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ssf_circuit::{context::LOCAL_ID, CircuitAcceptor, StackDialer};
use ssf_error::{Error, Result};
use ssf_fiber::{BoundedQueuePolicy, Multiplexer};
use ssf_net::{Acceptor, LayerParameters, ParameterStack};
use ssf_tls::{TlsEndpoint, TlsParam, TlsParameters};

use ssf::forwarder::{self, DEMO_HALF_ID};

fn build_test_pki() -> (TlsParameters, TlsParameters) {
    let mut ca_params = rcgen::CertificateParams::new(Vec::new());
    ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let ca_cert = rcgen::Certificate::from_params(ca_params).unwrap();

    let server_cert =
        rcgen::Certificate::from_params(rcgen::CertificateParams::new(vec!["ssf-peer".to_string()])).unwrap();
    let client_cert =
        rcgen::Certificate::from_params(rcgen::CertificateParams::new(vec!["ssf-peer".to_string()])).unwrap();

    let ca_pem = ca_cert.serialize_pem().unwrap();
    let server = TlsParameters {
        ca_cert: Some(TlsParam::Buffer(ca_pem.clone())),
        cert: Some(TlsParam::Buffer(server_cert.serialize_pem_with_signer(&ca_cert).unwrap())),
        key: Some(TlsParam::Buffer(server_cert.serialize_private_key_pem())),
        key_password: None,
        dh: None,
        cipher_alg: None,
    };
    let client = TlsParameters {
        ca_cert: Some(TlsParam::Buffer(ca_pem)),
        cert: Some(TlsParam::Buffer(client_cert.serialize_pem_with_signer(&ca_cert).unwrap())),
        key: Some(TlsParam::Buffer(client_cert.serialize_private_key_pem())),
        key_password: None,
        dh: None,
        cipher_alg: None,
    };
    (server, client)
}

async fn run_echo_service() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });
    addr
}

/// A minimal [`Acceptor`] over a plain, already-bound [`TcpListener`],
/// used here instead of `ssf-net`'s `TcpAcceptor` purely so the test can
/// read back the OS-assigned port before anything connects.
struct BoundTcp(TcpListener, std::net::SocketAddr);

impl BoundTcp {
    async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self(listener, addr)
    }
}

#[async_trait]
impl Acceptor for BoundTcp {
    type Socket = TcpStream;
    type Endpoint = std::net::SocketAddr;

    async fn accept(&mut self) -> Result<(Self::Socket, Self::Endpoint)> {
        let (stream, peer) = self.0.accept().await.map_err(Error::from)?;
        Ok((stream, peer))
    }

    fn local_endpoint(&self) -> Self::Endpoint {
        self.1
    }
}

/// Dials the fixed destination address directly, ignoring the `addr`/
/// `port` frame the caller's dialer contract says sits at the front of
/// `remainder` — this test topology has exactly one relay and one
/// destination, known up front, so there's nothing to resolve.
struct FixedTcpDialer {
    destination: std::net::SocketAddr,
}

#[async_trait]
impl StackDialer for FixedTcpDialer {
    type Socket = TcpStream;

    async fn dial(&self, mut remainder: ParameterStack) -> Result<Self::Socket> {
        remainder.pop_front();
        let stream = TcpStream::connect(self.destination).await.map_err(Error::from)?;
        ssf_circuit::connect(stream, &remainder).await
    }
}

/// The destination node never forwards, so its acceptor's dialer is
/// never called; this stands in purely to satisfy `CircuitAcceptor`'s
/// type parameter.
struct NeverDialer;

#[async_trait]
impl StackDialer for NeverDialer {
    type Socket = TcpStream;

    async fn dial(&self, _remainder: ParameterStack) -> Result<Self::Socket> {
        unreachable!("destination node never forwards")
    }
}

fn forward_frame() -> LayerParameters {
    let mut frame = LayerParameters::new();
    frame.insert("forward".to_string(), "1".to_string());
    frame.insert("circuit_id".to_string(), String::new());
    frame.insert("circuit_nodes".to_string(), String::new());
    frame.insert("details".to_string(), String::new());
    frame
}

fn terminal_frame() -> LayerParameters {
    let mut frame = LayerParameters::new();
    frame.insert("forward".to_string(), "0".to_string());
    frame.insert("circuit_id".to_string(), String::new());
    frame.insert("circuit_nodes".to_string(), String::new());
    frame.insert("details".to_string(), LOCAL_ID.to_string());
    frame
}

#[tokio::test]
async fn ping_round_trips_through_one_relay_hop() {
    let (server_tls, client_tls) = build_test_pki();
    let echo_addr = run_echo_service().await;

    // Destination node: terminates the circuit, then runs the same
    // TLS + fiber tunnel as the no-hop scenario.
    let destination_tcp = BoundTcp::bind().await;
    let destination_addr = destination_tcp.1;
    let mut destination_acceptor =
        CircuitAcceptor::new(destination_tcp, NeverDialer, "destination".to_string(), false);

    tokio::spawn(async move {
        let (socket, _endpoint) = destination_acceptor.accept().await.unwrap();
        let tls_socket = ssf_tls::accept(socket, &server_tls).await.unwrap();
        let mux = Multiplexer::new(tls_socket, Box::new(BoundedQueuePolicy::default()));
        let _ = forwarder::run_server_forwarder(mux, DEMO_HALF_ID, echo_addr).await;
    });

    // Relay node: plain TCP, forwards every connection one hop further.
    let relay_tcp = BoundTcp::bind().await;
    let relay_addr = relay_tcp.1;
    let dialer = FixedTcpDialer {
        destination: destination_addr,
    };
    let mut relay_acceptor = CircuitAcceptor::new(relay_tcp, dialer, "relay".to_string(), true);
    tokio::spawn(async move {
        let _ = relay_acceptor.accept().await;
    });

    // Client side: its own local tunnel-forwarding listener, same shape
    // as the no-hop scenario, but dialing the relay and writing a
    // two-frame stack (relay's forward frame, destination's terminal
    // frame) instead of connecting straight to a tunnel server.
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let forward_addr = client_listener.local_addr().unwrap();

    tokio::spawn(async move {
        let tcp = TcpStream::connect(relay_addr).await.unwrap();

        let mut stack = ParameterStack::new();
        stack.push_back(terminal_frame());
        stack.push_front(forward_frame());

        let tcp = ssf_circuit::connect(tcp, &stack).await.unwrap();

        let endpoint = TlsEndpoint::new((), client_tls);
        let tls_socket = ssf_tls::connect(tcp, &endpoint).await.unwrap();
        let mux = Multiplexer::new(tls_socket, Box::new(BoundedQueuePolicy::default()));
        let _ = forwarder::run_client_forwarder_on(client_listener, mux, DEMO_HALF_ID).await;
    });

    let mut raw_client = loop {
        match TcpStream::connect(forward_addr).await {
            Ok(socket) => break socket,
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    };

    raw_client.write_all(b"PING\n").await.unwrap();
    let mut buf = [0u8; 5];
    raw_client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"PING\n");
}
