//! Circuit `ParameterStack` construction, ported from
//! `data_link_layer/circuit_helpers.h`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use ssf_net::{LayerParameters, ParameterStack};
use ssf_error::{Error, ErrorKind, Result};

use crate::context::LOCAL_ID;

/// Writes `stack` as one length-prefixed MsgPack blob (spec §4.3's "Client
/// connect protocol" step 1: "the client emits one length-prefixed binary
/// blob"). Used both by the connecting client against the first hop and by
/// every forwarding hop against the next one — the wire step is identical
/// either way, just the stack being forwarded differs.
pub async fn write_stack_frame<W: AsyncWrite + Unpin>(io: &mut W, stack: &ParameterStack) -> Result<()> {
    let bytes = ssf_net::encode(stack)?;
    let len = u32::try_from(bytes.len()).map_err(|_| Error::new(ErrorKind::MessageTooLong))?;
    io.write_all(&len.to_be_bytes()).await.map_err(Error::from)?;
    io.write_all(&bytes).await.map_err(Error::from)?;
    Ok(())
}

/// Reads back a frame written by [`write_stack_frame`] (spec §4.3 step 2:
/// "the server-side of this node deserializes the blob").
pub async fn read_stack_frame<R: AsyncRead + Unpin>(io: &mut R) -> Result<ParameterStack> {
    let mut len_bytes = [0u8; 4];
    io.read_exact(&mut len_bytes).await.map_err(Error::from)?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).await.map_err(Error::from)?;
    Ok(ssf_net::decode(&buf))
}

fn make_forward_block(stack: &ParameterStack) -> Result<String> {
    let bytes = ssf_net::encode(stack)?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Parses a forward block previously produced by [`make_forward_block`].
/// A malformed block yields an empty stack, matching the original's
/// `make_parameter_stack` swallowing deserialization exceptions.
pub fn parse_forward_block(block: &str) -> ParameterStack {
    let bytes: Option<Vec<u8>> = (0..block.len())
        .step_by(2)
        .map(|i| block.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
        .collect();
    match bytes {
        Some(bytes) => ssf_net::decode(&bytes),
        None => ParameterStack::new(),
    }
}

fn next_forward_node_layer_parameters(next_node_full_stack: &ParameterStack) -> Result<LayerParameters> {
    let mut params = LayerParameters::new();
    params.insert("forward".to_string(), "1".to_string());
    params.insert("circuit_id".to_string(), String::new());
    params.insert("circuit_nodes".to_string(), make_forward_block(next_node_full_stack)?);
    params.insert("details".to_string(), String::new());
    Ok(params)
}

fn destination_node_parameter_stack() -> ParameterStack {
    let mut end = LayerParameters::new();
    end.insert("forward".to_string(), "0".to_string());
    end.insert("circuit_id".to_string(), String::new());
    end.insert("circuit_nodes".to_string(), String::new());
    end.insert("details".to_string(), LOCAL_ID.to_string());

    let mut stack = ParameterStack::new();
    stack.push_back(end);
    stack
}

/// A list of per-hop stacks, built up in the order the client adds nodes.
/// Naming follows the original's `PushFrontNode`/`PushBackNode` exactly,
/// including its apparent inversion (`PushFrontNode` appends to the
/// *back* of the underlying list) — preserved verbatim since the pairing
/// with `FrontNode`/`PopFrontNode` stays internally consistent.
#[derive(Default)]
pub struct NodeParameterList {
    nodes: Vec<ParameterStack>,
}

impl NodeParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_front_node(&mut self, stack: ParameterStack) {
        self.nodes.push(stack);
    }

    pub fn front_node_mut(&mut self) -> Option<&mut ParameterStack> {
        self.nodes.last_mut()
    }

    pub fn pop_front_node(&mut self) {
        self.nodes.pop();
    }

    pub fn add_top_layer_to_front_node(&mut self, top_layer: LayerParameters) {
        if let Some(stack) = self.nodes.last_mut() {
            stack.push_front(top_layer);
        }
    }

    pub fn push_back_node(&mut self, stack: ParameterStack) {
        self.nodes.insert(0, stack);
    }

    pub fn back_node_mut(&mut self) -> Option<&mut ParameterStack> {
        self.nodes.first_mut()
    }

    pub fn pop_back_node(&mut self) {
        if !self.nodes.is_empty() {
            self.nodes.remove(0);
        }
    }

    pub fn add_top_layer_to_back_node(&mut self, top_layer: LayerParameters) {
        if let Some(stack) = self.nodes.first_mut() {
            stack.push_front(top_layer);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterStack> {
        self.nodes.iter()
    }
}

/// Builds the full client-side circuit stack for `remote_id` through
/// `nodes`, folding the node list right-to-left from the destination frame
/// (spec §4.3 "Construction"). The first hop's own frame has its
/// `forward`/`circuit_id` overwritten with `"0"`/`remote_id` exactly as the
/// original does — preserved verbatim even though it reads as asymmetric
/// with every other hop's `forward: "1"` frame.
pub fn make_client_full_circuit_parameter_stack(
    remote_id: &str,
    nodes: &NodeParameterList,
) -> Result<ParameterStack> {
    let mut next_node_stack = destination_node_parameter_stack();

    for node in nodes.iter() {
        let mut current = node.clone();
        current.push_front(next_forward_node_layer_parameters(&next_node_stack)?);
        next_node_stack = current;
    }

    if let Some(front) = next_node_stack.front_mut() {
        front.insert("forward".to_string(), "0".to_string());
        front.insert("circuit_id".to_string(), remote_id.to_string());
    }

    Ok(next_node_stack)
}

/// Builds the server-side acceptor stack for a node that terminates the
/// circuit locally.
pub fn make_acceptor_parameter_stack(local_id: &str, next_layer_parameters: ParameterStack) -> ParameterStack {
    acceptor_stack(local_id, next_layer_parameters, "0")
}

/// Builds the server-side acceptor stack for a node that forwards.
pub fn make_forwarding_acceptor_parameter_stack(
    local_id: &str,
    next_layer_parameters: ParameterStack,
) -> ParameterStack {
    acceptor_stack(local_id, next_layer_parameters, "1")
}

fn acceptor_stack(local_id: &str, next_layer_parameters: ParameterStack, forward: &str) -> ParameterStack {
    let mut params = LayerParameters::new();
    params.insert("forward".to_string(), forward.to_string());
    params.insert("circuit_id".to_string(), local_id.to_string());
    params.insert("circuit_nodes".to_string(), String::new());
    params.insert("details".to_string(), String::new());

    let mut stack = next_layer_parameters;
    stack.push_front(params);
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stack_folds_right_to_left() {
        let mut nodes = NodeParameterList::new();
        let mut hop1 = ParameterStack::new();
        hop1.push_back(LayerParameters::new());
        nodes.push_front_node(hop1);

        let stack = make_client_full_circuit_parameter_stack("remote-1", &nodes).unwrap();
        let first = stack.front().unwrap();
        assert_eq!(first.get("forward").unwrap(), "0");
        assert_eq!(first.get("circuit_id").unwrap(), "remote-1");
    }

    #[test]
    fn forward_block_round_trips() {
        let mut stack = ParameterStack::new();
        let mut params = LayerParameters::new();
        params.insert("forward".to_string(), "0".to_string());
        stack.push_back(params);

        let block = make_forward_block(&stack).unwrap();
        let decoded = parse_forward_block(&block);
        assert_eq!(decoded, stack);
    }

    #[test]
    fn malformed_forward_block_yields_empty_stack() {
        assert_eq!(parse_forward_block("not-hex!!"), ParameterStack::new());
    }

    #[test]
    fn acceptor_stack_prepends_circuit_frame() {
        let stack = make_acceptor_parameter_stack("node-a", ParameterStack::new());
        let front = stack.front().unwrap();
        assert_eq!(front.get("forward").unwrap(), "0");
        assert_eq!(front.get("circuit_id").unwrap(), "node-a");
    }

    #[tokio::test]
    async fn stack_frame_round_trips_over_a_duplex_stream() {
        let mut stack = ParameterStack::new();
        let mut params = LayerParameters::new();
        params.insert("forward".to_string(), "0".to_string());
        params.insert("details".to_string(), LOCAL_ID.to_string());
        stack.push_back(params);

        let (mut a, mut b) = tokio::io::duplex(4096);
        write_stack_frame(&mut a, &stack).await.unwrap();
        let decoded = read_stack_frame(&mut b).await.unwrap();
        assert_eq!(decoded, stack);
    }

    #[tokio::test]
    async fn empty_stack_frame_round_trips() {
        let stack = ParameterStack::new();
        let (mut a, mut b) = tokio::io::duplex(64);
        write_stack_frame(&mut a, &stack).await.unwrap();
        let decoded = read_stack_frame(&mut b).await.unwrap();
        assert_eq!(decoded, stack);
    }
}
