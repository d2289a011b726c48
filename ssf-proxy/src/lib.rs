//! HTTP CONNECT and SOCKS4/4a/5 client traversal (spec §3, §4.5), kept free
//! of any dependency on `ssf-net` so the physical layer can depend on this
//! crate in one direction without a cycle.

pub mod auth;
pub mod config;
pub mod http_connect;
pub mod http_message;
pub mod http_parser;
pub mod socks;

pub use config::{Credentials, HttpProxyConfig, SocksProxyConfig, SocksVersion};
