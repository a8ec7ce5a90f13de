//! Peer IPC
//!
//! Request/reply messaging with the sibling services of the gateway.
//!
//! # Architecture
//!
//! - **types.rs**: Peer names, endpoints and error types
//! - **codec.rs**: Command encoding (CBOR resource commands, plain control words,
//!   switch bytes) and raw reply decoding
//! - **client.rs**: Transport trait, ZeroMQ REQ transport and the request/reply client
//!
//! # Usage
//!
//! ```ignore
//! use crate::system::ipc::{Command, Peer, RequestReplyClient};
//!
//! let client = RequestReplyClient::from_config(&config.peers);
//! let anonymous = client.flag(Peer::Broker, &Command::poll()).await?;
//! ```

pub mod client;
pub mod codec;
pub mod types;

pub use client::{RequestReplyClient, Transport, ZmqTransport, socket_path};
pub use codec::{Command, Reply, ReplyShape, Verb};
pub use types::{Endpoint, IpcError, Peer, PeerDirectory, Rejection, RejectionKind};
