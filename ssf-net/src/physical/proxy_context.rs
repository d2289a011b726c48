//! The proxy context attached to a TCP endpoint (spec §3 "Proxy context",
//! §4.1 connect side effect). JSON config (§6.1) is the natural home for
//! proxy settings, so unlike `ParameterStack` frames this context is built
//! directly from [`ssf_config`]-shaped values rather than serialized
//! through the wire format — there is no use case for shipping an upstream
//! HTTP/SOCKS proxy's credentials inside a circuit forwarding block.

use ssf_proxy::{HttpProxyConfig, SocksProxyConfig};

#[derive(Clone, Debug, Default)]
pub struct ProxyContext {
    pub enabled: bool,
    pub http_proxy: Option<HttpProxyConfig>,
    pub socks_proxy: Option<SocksProxyConfig>,
}

impl ProxyContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn http(config: HttpProxyConfig) -> Self {
        Self {
            enabled: true,
            http_proxy: Some(config),
            socks_proxy: None,
        }
    }

    pub fn socks(config: SocksProxyConfig) -> Self {
        Self {
            enabled: true,
            http_proxy: None,
            socks_proxy: Some(config),
        }
    }
}
