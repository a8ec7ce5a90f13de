//! Request/reply client
//!
//! Every call opens its own REQ socket, sends one request, waits for exactly
//! one reply and drops the socket on every exit path.

use async_trait::async_trait;
use bytes::BytesMut;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqError, ZmqMessage};

use super::codec::{self, Command, Reply, ReplyShape};
use super::types::{IpcError, Peer, PeerDirectory};
use crate::config::PeersConfig;

/// One request/reply exchange with a transport address
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        address: &str,
        payload: &[u8],
        wait: Duration,
    ) -> Result<Vec<u8>, IpcError>;
}

/// Strip the optional `ipc://` scheme from an endpoint address
pub fn socket_path(address: &str) -> &str {
    address.strip_prefix("ipc://").unwrap_or(address)
}

/// Endpoint URL; bare paths are taken as `ipc://` sockets
fn endpoint_url(address: &str) -> Cow<'_, str> {
    if address.contains("://") {
        Cow::Borrowed(address)
    } else {
        Cow::Owned(format!("ipc://{}", address))
    }
}

fn zmq_error(err: ZmqError) -> IpcError {
    match err {
        ZmqError::Network(e) => IpcError::from(e),
        ZmqError::NoMessage => {
            IpcError::ProtocolError("Connection closed before receiving response".to_string())
        }
        other => IpcError::ProtocolError(other.to_string()),
    }
}

/// ZeroMQ REQ socket transport
#[derive(Debug, Clone, Copy, Default)]
pub struct ZmqTransport;

#[async_trait]
impl Transport for ZmqTransport {
    async fn exchange(
        &self,
        address: &str,
        payload: &[u8],
        wait: Duration,
    ) -> Result<Vec<u8>, IpcError> {
        // One deadline covers connect, send and receive
        let deadline = Instant::now() + wait;
        let url = endpoint_url(address);

        // connect() retries until the socket shows up
        if url.starts_with("ipc://") && !Path::new(socket_path(&url)).exists() {
            return Err(IpcError::PeerUnreachable(format!(
                "{} does not exist",
                socket_path(&url)
            )));
        }

        let mut socket = ReqSocket::new();
        timeout_at(deadline, socket.connect(&url))
            .await
            .map_err(|_| IpcError::PeerUnreachable(format!("{} did not accept in time", url)))?
            .map_err(zmq_error)?;

        timeout_at(deadline, socket.send(ZmqMessage::from(payload.to_vec())))
            .await
            .map_err(|_| IpcError::Timeout)?
            .map_err(zmq_error)?;

        let reply = timeout_at(deadline, socket.recv())
            .await
            .map_err(|_| IpcError::Timeout)?
            .map_err(zmq_error)?;

        let mut body = BytesMut::new();
        for frame in reply.into_vec() {
            body.extend_from_slice(&frame);
        }
        Ok(body.to_vec())
    }
}

/// Sends commands to logical peers
pub struct RequestReplyClient {
    transport: Arc<dyn Transport>,
    peers: PeerDirectory,
}

impl RequestReplyClient {
    pub fn new(transport: Arc<dyn Transport>, peers: PeerDirectory) -> Self {
        Self { transport, peers }
    }

    /// Client over ZeroMQ with endpoints taken from configuration
    pub fn from_config(config: &PeersConfig) -> Self {
        Self::new(Arc::new(ZmqTransport), PeerDirectory::from_config(config))
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    /// Send a command and return the raw reply bytes
    pub async fn send(&self, peer: Peer, command: &Command) -> Result<Vec<u8>, IpcError> {
        let endpoint = self.peers.endpoint(peer);
        let payload = codec::encode(command)?;

        trace!(
            "IPC -> {} {} {}",
            peer.as_ref(),
            command.verb.name(),
            command.path
        );

        let result = self
            .transport
            .exchange(&endpoint.address, &payload, endpoint.timeout)
            .await;

        if let Err(ref e) = result {
            debug!(
                "IPC {} {} {} failed: {}",
                peer.as_ref(),
                command.verb.name(),
                command.path,
                e
            );
        }
        result
    }

    /// Send a command and decode the reply under the expected shape
    pub async fn request(
        &self,
        peer: Peer,
        command: &Command,
        shape: ReplyShape,
    ) -> Result<Reply, IpcError> {
        let bytes = self.send(peer, command).await?;
        codec::decode(&bytes, shape)
    }

    pub async fn flag(&self, peer: Peer, command: &Command) -> Result<bool, IpcError> {
        self.request(peer, command, ReplyShape::Flag)
            .await?
            .into_flag()
    }

    pub async fn text(&self, peer: Peer, command: &Command) -> Result<String, IpcError> {
        self.request(peer, command, ReplyShape::Text)
            .await?
            .into_text()
    }

    pub async fn document(
        &self,
        peer: Peer,
        command: &Command,
    ) -> Result<serde_json::Value, IpcError> {
        self.request(peer, command, ReplyShape::Document)
            .await?
            .into_document()
    }

    /// Send a mutation; an empty reply acknowledges it
    pub async fn acknowledge(&self, peer: Peer, command: &Command) -> Result<(), IpcError> {
        let bytes = self.send(peer, command).await?;
        codec::decode_ack(&bytes)
    }

    /// Send a command the peer confirms with exactly `marker`
    pub async fn confirm(
        &self,
        peer: Peer,
        command: &Command,
        marker: &str,
    ) -> Result<(), IpcError> {
        let bytes = self.send(peer, command).await?;
        codec::decode_marker(&bytes, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_strips_scheme() {
        assert_eq!(socket_path("ipc:///tmp/mqbc.sock"), "/tmp/mqbc.sock");
        assert_eq!(socket_path("/run/gnode/gclient.sock"), "/run/gnode/gclient.sock");
    }

    #[test]
    fn test_bare_paths_become_ipc_endpoints() {
        assert_eq!(endpoint_url("/tmp/mqbc.sock"), "ipc:///tmp/mqbc.sock");
        assert_eq!(endpoint_url("ipc:///tmp/mqbc.sock"), "ipc:///tmp/mqbc.sock");
        assert_eq!(endpoint_url("tcp://127.0.0.1:5555"), "tcp://127.0.0.1:5555");
    }

    #[tokio::test]
    async fn test_missing_socket_fails_fast() {
        let dir = std::env::temp_dir().join(format!("gnode-missing-{}", uuid::Uuid::new_v4()));
        let address = format!("ipc://{}", dir.join("peer.sock").display());

        let started = std::time::Instant::now();
        let result = ZmqTransport
            .exchange(&address, b"x", Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(IpcError::PeerUnreachable(_))));
        assert!(started.elapsed() < Duration::from_millis(300));
    }
}
