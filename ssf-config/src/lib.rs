//! Loads the `ssf` JSON configuration document (spec §6.1) and the
//! line-oriented circuit file (spec §6.2), grounded in
//! `common/config/{config,tls,proxy,services}.h` and `common/config/circuit.cpp`.

pub mod circuit;
mod services;

use std::fs;
use std::path::Path;

use serde::Deserialize;
use ssf_error::{Error, ErrorKind, Result};
use ssf_proxy::{Credentials, HttpProxyConfig, SocksProxyConfig, SocksVersion};
use ssf_tls::config::{TlsParam, TlsParameters};

pub use services::{ListenerService, Service, Services, ShellService};

/// The whole of `ssf`'s configuration, ready for the layer stack and the
/// microservices to consume directly — no further parsing needed downstream.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub tls: TlsParameters,
    pub http_proxy: Option<HttpProxyConfig>,
    pub socks_proxy: Option<SocksProxyConfig>,
    pub services: Services,
}

/// Loads and parses `path`. A missing file is not an error — `ssf` runs
/// fine with an all-default config — but malformed JSON is always
/// `invalid_argument` (spec §7's explicit config-loading carve-out).
pub fn load(path: &Path) -> Result<Config> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(Error::from(e)),
    };
    parse(&contents)
}

fn parse(contents: &str) -> Result<Config> {
    let raw: RawDocument = serde_json::from_str(contents)
        .map_err(|e| Error::with_source(ErrorKind::InvalidArgument, e))?;
    Ok(raw.ssf.unwrap_or_default().into())
}

#[derive(Deserialize, Default)]
struct RawDocument {
    ssf: Option<RawSsf>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "snake_case")]
struct RawSsf {
    tls: RawTls,
    http_proxy: Option<RawHttpProxy>,
    socks_proxy: Option<RawSocksProxy>,
    services: Services,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawTls {
    ca_cert_path: Option<String>,
    ca_cert_buffer: Option<String>,
    cert_path: Option<String>,
    cert_buffer: Option<String>,
    key_path: Option<String>,
    key_buffer: Option<String>,
    key_password: Option<String>,
    dh_path: Option<String>,
    dh_buffer: Option<String>,
    cipher_alg: Option<String>,
}

fn tls_param(path: Option<String>, buffer: Option<String>) -> Option<TlsParam> {
    path.map(|p| TlsParam::File(p.into()))
        .or_else(|| buffer.map(TlsParam::Buffer))
}

impl From<RawTls> for TlsParameters {
    fn from(raw: RawTls) -> Self {
        TlsParameters {
            ca_cert: tls_param(raw.ca_cert_path, raw.ca_cert_buffer),
            cert: tls_param(raw.cert_path, raw.cert_buffer),
            key: tls_param(raw.key_path, raw.key_buffer),
            key_password: raw.key_password,
            dh: tls_param(raw.dh_path, raw.dh_buffer),
            cipher_alg: raw.cipher_alg,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawHttpProxy {
    host: String,
    port: u16,
    credentials: Option<RawCredentials>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCredentials {
    username: String,
    domain: String,
    password: String,
    reuse_ntlm: bool,
    reuse_kerb: bool,
}

impl From<RawCredentials> for Credentials {
    fn from(raw: RawCredentials) -> Self {
        Credentials {
            username: raw.username,
            password: raw.password,
            domain: raw.domain,
            reuse_ntlm: raw.reuse_ntlm,
            reuse_kerberos: raw.reuse_kerb,
        }
    }
}

impl From<RawHttpProxy> for HttpProxyConfig {
    fn from(raw: RawHttpProxy) -> Self {
        HttpProxyConfig {
            host: raw.host,
            port: raw.port,
            credentials: raw.credentials.unwrap_or_default().into(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSocksProxy {
    version: u8,
    host: String,
    port: u16,
}

impl TryFrom<RawSocksProxy> for SocksProxyConfig {
    type Error = Error;

    fn try_from(raw: RawSocksProxy) -> Result<Self> {
        let version = match raw.version {
            4 => SocksVersion::V4,
            5 => SocksVersion::V5,
            _ => return Err(Error::new(ErrorKind::InvalidArgument)),
        };
        Ok(SocksProxyConfig {
            version,
            host: raw.host,
            port: raw.port,
        })
    }
}

impl From<RawSsf> for Config {
    fn from(raw: RawSsf) -> Self {
        Config {
            tls: raw.tls.into(),
            http_proxy: raw.http_proxy.map(Into::into),
            socks_proxy: raw.socks_proxy.and_then(|p| SocksProxyConfig::try_from(p).ok()),
            services: raw.services,
        }
    }
}
