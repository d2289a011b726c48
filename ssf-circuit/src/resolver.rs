//! Resolves a circuit layer frame off a [`ParameterStack`] into a
//! [`CircuitEndpointContext`], then delegates the remaining stack to the
//! layer below, ported from `detail::make_circuit_context`.

use async_trait::async_trait;
use ssf_error::Result;
use ssf_net::{ParameterStack, Resolver};

use crate::context::CircuitEndpointContext;
use crate::endpoint::CircuitEndpoint;

pub struct CircuitResolver<R> {
    lower: R,
}

impl<R> CircuitResolver<R> {
    pub fn new(lower: R) -> Self {
        Self { lower }
    }
}

#[async_trait]
impl<R: Resolver + Sync> Resolver for CircuitResolver<R> {
    type Endpoint = CircuitEndpoint<R::Endpoint>;

    async fn resolve(&self, stack: &mut ParameterStack) -> Result<Self::Endpoint> {
        let context = CircuitEndpointContext::from_stack(stack);
        let lower = self.lower.resolve(stack).await?;
        Ok(CircuitEndpoint::new(lower, context))
    }
}
