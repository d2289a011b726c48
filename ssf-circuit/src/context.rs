//! A circuit hop's per-connection context (spec §3, §4.3), ported
//! field-for-field from `CircuitEndpointContext` in
//! `data_link_layer/circuit_endpoint_context.h`.

use ssf_net::{get_field_or, ParameterStack};

/// The local-termination marker used in place of a real circuit id on the
/// destination hop's frame (`detail::get_local_id` in the original).
pub const LOCAL_ID: &str = "-1";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CircuitEndpointContext {
    pub forward: bool,
    pub id: String,
    pub forward_blocks: String,
    pub details: String,
}

impl CircuitEndpointContext {
    /// Parses the `forward` field the same way the original does:
    /// `std::stoul` on the string, falling back to `false` on any parse
    /// failure rather than propagating an error.
    pub fn parse_forward(raw: &str) -> bool {
        raw.parse::<u32>().map(|v| v != 0).unwrap_or(false)
    }

    /// Pops this hop's own frame off the front of `stack` and decodes it
    /// (ported from `detail::make_circuit_context`). Shared by the
    /// client-side [`crate::resolver::CircuitResolver`], which resolves an
    /// in-memory stack built for `connect`, and the server-side
    /// [`crate::socket::CircuitAcceptor`], which decodes a stack just read
    /// off the wire (spec §4.3 step 2).
    pub fn from_stack(stack: &mut ParameterStack) -> Self {
        let frame = stack.pop_front().unwrap_or_default();
        Self {
            forward: Self::parse_forward(get_field_or("forward", &frame, "0")),
            id: get_field_or("circuit_id", &frame, "").to_string(),
            forward_blocks: get_field_or("circuit_nodes", &frame, "").to_string(),
            details: get_field_or("details", &frame, "").to_string(),
        }
    }
}
