//! A TLS endpoint pairs the endpoint of the layer below with the resolved
//! TLS parameters for this hop (spec §4.2): nothing *network-identifying*
//! is added, but the cert/key material used to run the handshake travels
//! with the endpoint so `connect`/`accept` never need the original
//! `ParameterStack` again.

use std::sync::Arc;

use crate::config::TlsParameters;

#[derive(Clone, Debug)]
pub struct TlsEndpoint<E> {
    pub(crate) lower: E,
    pub(crate) params: Arc<TlsParameters>,
}

impl<E> TlsEndpoint<E> {
    pub fn new(lower: E, params: TlsParameters) -> Self {
        Self {
            lower,
            params: Arc::new(params),
        }
    }

    pub fn lower(&self) -> &E {
        &self.lower
    }

    pub fn params(&self) -> &TlsParameters {
        &self.params
    }
}
