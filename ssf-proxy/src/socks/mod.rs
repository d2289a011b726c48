//! SOCKS client connect dispatch (spec §4.5.1 scenario 4), picking the v4
//! or v5 wire handshake per [`crate::config::SocksVersion`].

pub mod v4;
pub mod v5;

use ssf_error::Error;
use tokio::net::TcpStream;

use crate::config::{SocksProxyConfig, SocksVersion};

pub async fn connect(
    config: &SocksProxyConfig,
    target_host: &str,
    target_port: u16,
) -> ssf_error::Result<TcpStream> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(Error::from)?;

    match config.version {
        SocksVersion::V4 => v4::connect(&mut stream, target_host, target_port).await?,
        SocksVersion::V5 => v5::connect(&mut stream, target_host, target_port).await?,
    }

    Ok(stream)
}
