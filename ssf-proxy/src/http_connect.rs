//! The HTTP CONNECT client state machine (spec §4.5.1): dial the proxy,
//! send `CONNECT`, and retry with escalating authentication until the
//! proxy answers 200, mirroring `HttpProxyStrategy`'s
//! `Connect -> Processing -> {Success, Error}` loop in the original
//! implementation.

use ssf_error::{Error, ErrorKind, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::auth::{self, AuthStrategy, Channel};
use crate::config::HttpProxyConfig;
use crate::http_message::HttpRequest;
use crate::http_parser::HttpResponseBuilder;

const MAX_AUTH_ATTEMPTS: usize = 4;

/// Dials `config.host:config.port`, issues `CONNECT target_host:target_port`,
/// and authenticates against however many `407` challenges the proxy sends,
/// returning the still-open socket positioned right after the CONNECT
/// response once the proxy answers `200`.
pub async fn connect(config: &HttpProxyConfig, target_host: &str, target_port: u16) -> Result<TcpStream> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(Error::from)?;

    let mut strategy: Option<Box<dyn AuthStrategy>> = None;

    for attempt in 0..=MAX_AUTH_ATTEMPTS {
        let mut request = HttpRequest::connect(target_host, target_port);
        if let Some(strategy) = &mut strategy {
            strategy.populate_request(Channel::Proxy, &mut request);
        }

        stream
            .write_all(request.generate().as_bytes())
            .await
            .map_err(Error::from)?;

        let response = read_response(&mut stream).await?;

        if response.success() {
            debug!(attempt, "proxy CONNECT succeeded");
            return Ok(stream);
        }

        if !response.authentication_required() {
            warn!(status = response.status_code, "proxy CONNECT rejected");
            return Err(Error::new(ErrorKind::ConnectionRefused));
        }

        if attempt == MAX_AUTH_ATTEMPTS {
            return Err(Error::new(ErrorKind::ConnectionRefused));
        }

        match &mut strategy {
            Some(existing) => {
                existing.process_response(Channel::Proxy, &response)?;
            }
            None => {
                let mut selected =
                    auth::select_strategy(Channel::Proxy, &response, &config.credentials)
                        .ok_or_else(|| Error::new(ErrorKind::ConnectionRefused))?;
                selected.process_response(Channel::Proxy, &response)?;
                strategy = Some(selected);
            }
        }
    }

    Err(Error::new(ErrorKind::ConnectionRefused))
}

async fn read_response(stream: &mut TcpStream) -> Result<crate::http_message::HttpResponse> {
    let mut builder = HttpResponseBuilder::new();
    let mut chunk = [0u8; 4096];
    while !builder.done() {
        let n = stream.read(&mut chunk).await.map_err(Error::from)?;
        if n == 0 {
            return Err(Error::new(ErrorKind::ConnectionAborted));
        }
        builder.process(&chunk[..n])?;
    }
    Ok(builder.take())
}
