//! SOCKS4 and SOCKS4a client connect requests, grounded in
//! `socks4_strategy.cpp` and `network/socks/v4/request.h`/`reply.h`.
//!
//! Wire format of the `CONNECT` request:
//! `VN(1)=4 | CD(1)=1 | DSTPORT(2, be) | DSTIP(4) | USERID(nul-terminated)`,
//! plus, for SOCKS4a domain names, `DSTIP = 0.0.0.N` (the original uses
//! `N=0xFF`; spec.md's worked byte sequence fixes `N=1`, so this build
//! follows the spec's byte sequence — see the design ledger) followed by
//! `DOMAIN(nul-terminated)`.
//!
//! Reply: `VN(1)=0 | CD(1) | DSTPORT(2) | DSTIP(4)`, with `CD=0x5a` meaning
//! request granted.

use std::net::Ipv4Addr;

use ssf_error::{Error, ErrorKind, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The SOCKS4a domain-name sentinel's last IPv4 octet. The original uses
/// `0xFF`; this build follows spec.md's literal scenario-4 byte sequence.
const SOCKS4A_SENTINEL_N: u8 = 1;

const REPLY_GRANTED: u8 = 0x5a;

pub async fn connect(stream: &mut TcpStream, target_host: &str, target_port: u16) -> Result<()> {
    let mut request = vec![0x04u8, 0x01];
    request.extend_from_slice(&target_port.to_be_bytes());

    match target_host.parse::<Ipv4Addr>() {
        Ok(addr) => {
            request.extend_from_slice(&addr.octets());
            request.push(0); // empty USERID
        }
        Err(_) => {
            // SOCKS4a: non-routable placeholder address, then the domain.
            request.extend_from_slice(&[0, 0, 0, SOCKS4A_SENTINEL_N]);
            request.push(0); // empty USERID
            request.extend_from_slice(target_host.as_bytes());
            request.push(0);
        }
    }

    stream.write_all(&request).await.map_err(Error::from)?;

    let mut reply = [0u8; 8];
    stream.read_exact(&mut reply).await.map_err(Error::from)?;

    if reply[1] != REPLY_GRANTED {
        return Err(Error::new(ErrorKind::ConnectionRefused));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_reply_with_nonzero_version() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            use tokio::io::AsyncReadExt;
            let n = server.read(&mut buf).await.unwrap();
            let _ = &buf[..n];
            use tokio::io::AsyncWriteExt;
            server.write_all(&[0, 0x5b, 0, 0, 0, 0, 0, 0]).await.unwrap();
        });

        let mut request = vec![0x04u8, 0x01];
        request.extend_from_slice(&80u16.to_be_bytes());
        request.extend_from_slice(&[127, 0, 0, 1]);
        request.push(0);
        client.write_all(&request).await.unwrap();

        let mut reply = [0u8; 8];
        client.read_exact(&mut reply).await.unwrap();
        assert_ne!(reply[1], REPLY_GRANTED);
        task.await.unwrap();
    }
}
