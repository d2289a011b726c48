//! The fiber multiplexer (spec §4.4): one reliable, ordered byte stream
//! (the "link") carries many independent stream-or-datagram flows
//! ("fibers"), addressed by `(protocol, port)` pairs on each side.
//!
//! This is the subsystem spec §2 calls "the hardest part" and the one
//! with no direct counterpart in `original_source/` (SSF's own fiber
//! library, `libfmux`, isn't part of the retrieved sources — only its
//! multiplexing *building blocks* are, in
//! `network/ssf/layer/multiplexing/`). The send-loop/congestion-policy
//! shape is ported from `basic_multiplexer.h`; the addressing scheme from
//! `protocol_and_port_multiplex_id.h`; everything else (frame kinds, the
//! registry, the stream/datagram socket split) is built from spec §4.4's
//! prose to the same engineering style.
//!
//! Open Question: only a stream link (TLS/circuit/TCP below) is
//! implemented, matching spec §2's "Fiber multiplex (one byte-stream -> N
//! fibers)" header. A UDP-as-link variant (one `recv` == one frame) would
//! need a second `Multiplexer` constructor over a message-oriented
//! transport; SSF's own UDP port forwarding instead carries datagrams as
//! payloads of *datagram fibers* inside the one stream link, which is
//! what `FiberDatagramSocket` provides here.

pub mod acceptor;
pub mod congestion;
pub mod frame;
pub mod id;
pub mod multiplexer;
pub mod resolver;
mod shared;
pub mod socket;

pub use acceptor::{FiberAcceptor, FiberEndpoint};
pub use congestion::{BoundedQueuePolicy, CongestionPolicy};
pub use id::{FullId, HalfId, PROTOCOL_DATAGRAM, PROTOCOL_STREAM};
pub use multiplexer::Multiplexer;
pub use resolver::FiberResolver;
pub use socket::{FiberDatagramSocket, FiberSocket};
