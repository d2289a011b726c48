//! End-to-end mutual TLS handshake over a real loopback TCP connection
//! (spec §4.2's "never yields plaintext before handshake completes").

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ssf_tls::{TlsParam, TlsParameters};

struct TestPki {
    ca_pem: String,
    server_cert_pem: String,
    server_key_pem: String,
    client_cert_pem: String,
    client_key_pem: String,
}

fn build_test_pki() -> TestPki {
    let mut ca_params = rcgen::CertificateParams::new(Vec::new());
    ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let ca_cert = rcgen::Certificate::from_params(ca_params).unwrap();

    let server_params = rcgen::CertificateParams::new(vec!["ssf-peer".to_string()]);
    let server_cert = rcgen::Certificate::from_params(server_params).unwrap();

    let client_params = rcgen::CertificateParams::new(vec!["ssf-peer".to_string()]);
    let client_cert = rcgen::Certificate::from_params(client_params).unwrap();

    TestPki {
        ca_pem: ca_cert.serialize_pem().unwrap(),
        server_cert_pem: server_cert.serialize_pem_with_signer(&ca_cert).unwrap(),
        server_key_pem: server_cert.serialize_private_key_pem(),
        client_cert_pem: client_cert.serialize_pem_with_signer(&ca_cert).unwrap(),
        client_key_pem: client_cert.serialize_private_key_pem(),
    }
}

#[tokio::test]
async fn mutual_handshake_then_plaintext_echo() {
    let pki = build_test_pki();

    let server_params = TlsParameters {
        ca_cert: Some(TlsParam::Buffer(pki.ca_pem.clone())),
        cert: Some(TlsParam::Buffer(pki.server_cert_pem)),
        key: Some(TlsParam::Buffer(pki.server_key_pem)),
        key_password: None,
        dh: None,
        cipher_alg: None,
    };
    let client_params = TlsParameters {
        ca_cert: Some(TlsParam::Buffer(pki.ca_pem)),
        cert: Some(TlsParam::Buffer(pki.client_cert_pem)),
        key: Some(TlsParam::Buffer(pki.client_key_pem)),
        key_password: None,
        dh: None,
        cipher_alg: None,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut tls = ssf_tls::accept(tcp, &server_params).await.unwrap();
        let mut buf = [0u8; 5];
        tls.read_exact(&mut buf).await.unwrap();
        tls.write_all(&buf).await.unwrap();
    });

    let tcp = TcpStream::connect(addr).await.unwrap();
    let endpoint = ssf_tls::TlsEndpoint::new((), client_params);
    let mut tls = ssf_tls::connect(tcp, &endpoint).await.unwrap();
    tls.write_all(b"PING\n").await.unwrap();
    let mut buf = [0u8; 5];
    tls.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"PING\n");

    server.await.unwrap();
}
