//! SOCKS5 client connect handshake, grounded in `network/socks/v5/request.h`,
//! `request_auth.h`, and `reply_auth.h`. Three phases on the wire:
//!
//! 1. Method negotiation: `VER(1)=5 | NMETHODS(1) | METHODS(NMETHODS)` ->
//!    `VER(1)=5 | METHOD(1)`. This build only offers `NO_AUTH (0x00)`.
//! 2. Connect request: `VER=5 | CMD=1 | RSV=0 | ATYP | DST.ADDR | DST.PORT`.
//! 3. Reply: `VER=5 | REP | RSV=0 | ATYP | BND.ADDR | BND.PORT`, `REP=0`
//!    meaning succeeded.

use std::net::{Ipv4Addr, Ipv6Addr};

use ssf_error::{Error, ErrorKind, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_NO_ACCEPTABLE: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;
const REP_SUCCEEDED: u8 = 0x00;

/// The method a server selects in phase 1. `from_wire_byte` is a
/// deliberately retained mapping (see the design ledger's Open Question
/// decision) so a server's arbitrary method byte always round-trips to a
/// typed value instead of panicking on an unrecognized one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MethodSelection {
    NoAuth,
    NoAcceptable,
    Other(u8),
}

impl MethodSelection {
    pub fn from_wire_byte(byte: u8) -> Self {
        match byte {
            METHOD_NO_AUTH => MethodSelection::NoAuth,
            METHOD_NO_ACCEPTABLE => MethodSelection::NoAcceptable,
            other => MethodSelection::Other(other),
        }
    }
}

pub async fn connect(stream: &mut TcpStream, target_host: &str, target_port: u16) -> Result<()> {
    negotiate_method(stream).await?;
    send_connect_request(stream, target_host, target_port).await?;
    read_reply(stream).await
}

async fn negotiate_method(stream: &mut TcpStream) -> Result<()> {
    stream
        .write_all(&[VERSION, 1, METHOD_NO_AUTH])
        .await
        .map_err(Error::from)?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await.map_err(Error::from)?;

    if reply[0] != VERSION {
        return Err(Error::new(ErrorKind::ProtocolError));
    }
    match MethodSelection::from_wire_byte(reply[1]) {
        MethodSelection::NoAuth => Ok(()),
        _ => Err(Error::new(ErrorKind::ConnectionRefused)),
    }
}

async fn send_connect_request(
    stream: &mut TcpStream,
    target_host: &str,
    target_port: u16,
) -> Result<()> {
    let mut request = vec![VERSION, CMD_CONNECT, 0x00];

    if let Ok(addr) = target_host.parse::<Ipv4Addr>() {
        request.push(ATYP_IPV4);
        request.extend_from_slice(&addr.octets());
    } else if let Ok(addr) = target_host.parse::<Ipv6Addr>() {
        request.push(ATYP_IPV6);
        request.extend_from_slice(&addr.octets());
    } else {
        if target_host.is_empty() || target_host.len() > 255 {
            return Err(Error::new(ErrorKind::ProtocolError));
        }
        request.push(ATYP_DOMAIN);
        request.push(target_host.len() as u8);
        request.extend_from_slice(target_host.as_bytes());
    }
    request.extend_from_slice(&target_port.to_be_bytes());

    stream.write_all(&request).await.map_err(Error::from)
}

async fn read_reply(stream: &mut TcpStream) -> Result<()> {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.map_err(Error::from)?;

    if head[0] != VERSION {
        return Err(Error::new(ErrorKind::ProtocolError));
    }
    if head[1] != REP_SUCCEEDED {
        return Err(Error::new(ErrorKind::ConnectionRefused));
    }

    let addr_len = match head[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await.map_err(Error::from)?;
            len[0] as usize
        }
        _ => return Err(Error::new(ErrorKind::ProtocolError)),
    };

    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await.map_err(Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_wire_byte_maps_known_methods() {
        assert_eq!(MethodSelection::from_wire_byte(0x00), MethodSelection::NoAuth);
        assert_eq!(
            MethodSelection::from_wire_byte(0xFF),
            MethodSelection::NoAcceptable
        );
        assert_eq!(MethodSelection::from_wire_byte(0x02), MethodSelection::Other(0x02));
    }
}
