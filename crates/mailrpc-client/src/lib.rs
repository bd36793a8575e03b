//! Duplex-socket RPC client for the webmail API.
//!
//! [`Client`] multiplexes request/response calls over one persistent,
//! message-framed channel (a SockJS or plain websocket in production, an
//! in-memory pair in tests). Responses are matched to calls by correlation
//! id; the typed wrappers in [`api`] cover the token, account, email and key
//! routes.
//!
//! This crate also provides the `mailrpc` command-line interface.

pub mod api;
pub mod channel;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod receiver;
pub mod registry;
pub mod secret;

pub use channel::{DuplexChannel, FrameSink, FrameSource, MemoryChannel, MemoryPeer, Transport, WsChannel};
pub use cli::Cli;
pub use client::{Call, Client, ClientOptions, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult};
pub use receiver::{LoopState, StopReason};
