//! Resolves a fiber layer frame off a [`ssf_net::ParameterStack`] into a
//! [`HalfId`], ported from `ProtocolAndPortMultiplexID::MakeHalfID`'s
//! `protocol`/`port` field lookup (parse failure yields the null
//! `HalfId`, matching the original's catch-and-default rather than
//! propagating an error — this frame only ever describes a local bind
//! port, never something whose validity gates the rest of the stack).

use async_trait::async_trait;
use ssf_error::Result;
use ssf_net::{get_field_or, ParameterStack, Resolver};

use crate::id::HalfId;

fn resolve_half_id(stack: &mut ParameterStack) -> HalfId {
    let frame = stack.pop_front().unwrap_or_default();
    let protocol: u8 = get_field_or("protocol", &frame, "0").parse().unwrap_or(0);
    let port: u16 = get_field_or("port", &frame, "0").parse().unwrap_or(0);
    HalfId::new(protocol, port)
}

pub struct FiberResolver<R> {
    lower: R,
}

impl<R> FiberResolver<R> {
    pub fn new(lower: R) -> Self {
        Self { lower }
    }
}

#[async_trait]
impl<R: Resolver + Sync> Resolver for FiberResolver<R> {
    type Endpoint = (HalfId, R::Endpoint);

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint> {
        let half = resolve_half_id(stack);
        let lower = self.lower.resolve(stack).await?;
        Ok((half, lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssf_net::LayerParameters;

    #[test]
    fn resolves_protocol_and_port() {
        let mut params = LayerParameters::new();
        params.insert("protocol".to_string(), "6".to_string());
        params.insert("port".to_string(), "22".to_string());
        let mut stack = ParameterStack::new();
        stack.push_back(params);

        let half = resolve_half_id(&mut stack);
        assert_eq!(half, HalfId::new(6, 22));
    }

    #[test]
    fn malformed_fields_default_to_null_half_id() {
        let mut params = LayerParameters::new();
        params.insert("protocol".to_string(), "not-a-number".to_string());
        let mut stack = ParameterStack::new();
        stack.push_back(params);

        assert!(resolve_half_id(&mut stack).is_null());
    }
}
