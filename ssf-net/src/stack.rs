//! The universal, serializable "how to connect/listen" description (spec
//! §3, §6.3).
//!
//! A [`LayerParameters`] is an ordered string→string mapping; a
//! [`ParameterStack`] is a front-to-back sequence of them, one per layer,
//! top-to-bottom. `ParameterStack` is acyclic — a circuit hop's forwarding
//! block embeds a *serialized* remainder stack (§4.3), never a live
//! reference to one — so there is no graph support here, just a deque of
//! owned maps (ported from the original's `std::list<LayerParameters>` in
//! `core/virtual_network/parameters.h`).

use std::collections::{BTreeMap, VecDeque};

use ssf_error::{Error, ErrorKind, Result};

pub type LayerParameters = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParameterStack(VecDeque<LayerParameters>);

impl ParameterStack {
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    pub fn push_front(&mut self, params: LayerParameters) {
        self.0.push_front(params);
    }

    pub fn push_back(&mut self, params: LayerParameters) {
        self.0.push_back(params);
    }

    pub fn pop_front(&mut self) -> Option<LayerParameters> {
        self.0.pop_front()
    }

    pub fn front(&self) -> Option<&LayerParameters> {
        self.0.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut LayerParameters> {
        self.0.front_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerParameters> {
        self.0.iter()
    }
}

impl From<VecDeque<LayerParameters>> for ParameterStack {
    fn from(v: VecDeque<LayerParameters>) -> Self {
        Self(v)
    }
}

impl FromIterator<LayerParameters> for ParameterStack {
    fn from_iter<T: IntoIterator<Item = LayerParameters>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ParameterStack {
    type Item = LayerParameters;
    type IntoIter = std::collections::vec_deque::IntoIter<LayerParameters>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Looks up a required string field, mapping a missing key to
/// `missing_config_parameters` (ported from `common/utils/map_helpers.h`'s
/// `GetField`).
pub fn get_field<'a>(key: &str, params: &'a LayerParameters) -> Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::new(ErrorKind::MissingConfigParameters))
}

pub fn get_field_or<'a>(key: &str, params: &'a LayerParameters, default: &'a str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or(default)
}

/// Encodes a [`ParameterStack`] as MsgPack over the sequence-of-maps shape
/// (spec §6.3): used both to embed a downstream route inside a circuit
/// forwarding block and to ship an opaque stack through JSON config.
pub fn encode(stack: &ParameterStack) -> Result<Vec<u8>> {
    let maps: Vec<&LayerParameters> = stack.0.iter().collect();
    rmp_serde::to_vec(&maps).map_err(|e| Error::with_source(ErrorKind::InvalidArgument, e))
}

/// Decodes a [`ParameterStack`] previously produced by [`encode`]. A
/// malformed blob yields an *empty* stack rather than an error, matching
/// the original's `make_parameter_stack` which swallows deserialization
/// exceptions (`circuit_helpers.h`).
pub fn decode(bytes: &[u8]) -> ParameterStack {
    rmp_serde::from_slice::<Vec<LayerParameters>>(bytes)
        .map(|maps| maps.into_iter().collect())
        .unwrap_or_default()
}
