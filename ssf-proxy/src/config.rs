//! The proxy configuration values consulted by the connect state machines
//! (spec §3 "Proxy context", §6.1).

#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub reuse_ntlm: bool,
    pub reuse_kerberos: bool,
}

#[derive(Clone, Debug)]
pub struct HttpProxyConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SocksVersion {
    V4,
    V5,
}

#[derive(Clone, Debug)]
pub struct SocksProxyConfig {
    pub version: SocksVersion,
    pub host: String,
    pub port: u16,
}
