//! Wiring of the layer crates into a client/server binary (SPEC_FULL.md
//! §2's "root package: CLI entry points, runtime bootstrap, wiring of the
//! layers ... and a minimal demo service").

pub mod cli;
pub mod forwarder;
pub mod runtime;
pub mod session;
