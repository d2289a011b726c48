//! Resolves a TLS layer frame off a [`ParameterStack`] into
//! [`TlsParameters`], then delegates the remaining stack to the layer
//! below (spec §4.2, §4.1's uniform `Resolver` contract).

use std::path::PathBuf;

use async_trait::async_trait;
use ssf_error::Result;
use ssf_net::{ParameterStack, Resolver};

use crate::config::{TlsParam, TlsParameters};
use crate::endpoint::TlsEndpoint;

fn field_as_param(params: &ssf_net::LayerParameters, key: &str) -> Option<TlsParam> {
    params.get(key).map(|v| TlsParam::File(PathBuf::from(v)))
}

fn resolve_tls_parameters(stack: &mut ParameterStack) -> TlsParameters {
    let frame = stack.pop_front().unwrap_or_default();
    TlsParameters {
        ca_cert: field_as_param(&frame, "ca_cert"),
        cert: field_as_param(&frame, "cert"),
        key: field_as_param(&frame, "key"),
        key_password: frame.get("key_password").cloned(),
        dh: field_as_param(&frame, "dh"),
        cipher_alg: frame.get("cipher_alg").cloned(),
    }
}

pub struct TlsResolver<R> {
    lower: R,
}

impl<R> TlsResolver<R> {
    pub fn new(lower: R) -> Self {
        Self { lower }
    }
}

#[async_trait]
impl<R: Resolver + Sync> Resolver for TlsResolver<R> {
    type Endpoint = TlsEndpoint<R::Endpoint>;

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint> {
        let params = resolve_tls_parameters(stack);
        let lower = self.lower.resolve(stack).await?;
        Ok(TlsEndpoint::new(lower, params))
    }
}
