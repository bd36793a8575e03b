//! Shared plumbing for the mailrpc crates.
//!
//! Currently this is the tracing bootstrap used by the `mailrpc` binary and
//! by anything embedding the client that wants the same log layout.

pub mod tracing;

pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
