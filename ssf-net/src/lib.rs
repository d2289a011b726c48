//! Layer parameters, the per-layer capability traits, and the physical
//! TCP/UDP layer (spec §3, §4.1).

pub mod layer;
pub mod physical;
pub mod stack;

pub use layer::{Acceptor, Endpoint, ProtocolAttributes, Resolver, Socket};
pub use stack::{decode, encode, get_field, get_field_or, LayerParameters, ParameterStack};
