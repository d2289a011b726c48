//! The mutually-authenticated TLS pass-through layer (spec §4.2).

pub mod config;
pub mod endpoint;
pub mod resolver;
pub mod socket;

pub use config::{TlsParam, TlsParameters};
pub use endpoint::TlsEndpoint;
pub use resolver::TlsResolver;
pub use socket::{accept, connect, TlsAcceptor, TlsClientSocket, TlsServerSocket};
