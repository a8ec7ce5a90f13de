//! IPC type definitions
//!
//! Defines the types shared by the peer gateway:
//! - `Peer`: logical names of the sibling services
//! - `Endpoint` / `PeerDirectory`: logical name → transport address + timeout
//! - `Rejection`: an application-level error reported by a peer
//! - `IpcError`: every way a single exchange can fail

use std::fmt;
use std::io;
use std::time::Duration;

use strum::AsRefStr;

use crate::config::{PeerConfig, PeersConfig};

/// Sibling services reachable over request/reply IPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Peer {
    /// Message-broker configuration endpoint (mqbc)
    Broker,
    /// Bridge service configuration endpoint (m2eb)
    Bridge,
    /// Cloud-tunnel client (gclient)
    Tunnel,
}

/// Transport address and reply deadline of one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub timeout: Duration,
}

impl From<&PeerConfig> for Endpoint {
    fn from(config: &PeerConfig) -> Self {
        Self {
            address: config.address.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Resolves logical peers to endpoints
#[derive(Debug, Clone)]
pub struct PeerDirectory {
    broker: Endpoint,
    bridge: Endpoint,
    tunnel: Endpoint,
}

impl PeerDirectory {
    pub fn new(broker: Endpoint, bridge: Endpoint, tunnel: Endpoint) -> Self {
        Self {
            broker,
            bridge,
            tunnel,
        }
    }

    pub fn from_config(config: &PeersConfig) -> Self {
        Self::new(
            Endpoint::from(&config.broker),
            Endpoint::from(&config.bridge),
            Endpoint::from(&config.tunnel),
        )
    }

    pub fn endpoint(&self, peer: Peer) -> &Endpoint {
        match peer {
            Peer::Broker => &self.broker,
            Peer::Bridge => &self.bridge,
            Peer::Tunnel => &self.tunnel,
        }
    }
}

/// Category of a peer-reported application error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NotFound,
    Conflict,
    Refused,
}

impl RejectionKind {
    pub fn as_wire(&self) -> &'static str {
        match self {
            RejectionKind::NotFound => "not_found",
            RejectionKind::Conflict => "conflict",
            RejectionKind::Refused => "refused",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "not_found" => RejectionKind::NotFound,
            "conflict" | "already_exists" => RejectionKind::Conflict,
            _ => RejectionKind::Refused,
        }
    }
}

/// Application-level error reported by a peer in place of a normal reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Conflict, message)
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Refused, message)
    }
}

/// IPC errors
#[derive(Debug)]
pub enum IpcError {
    /// Connection could not be established (socket missing or refused)
    PeerUnreachable(String),
    /// No reply within the endpoint's deadline
    Timeout,
    /// Socket-level failure or unexpected connection close
    ProtocolError(String),
    /// Reply arrived but does not have the expected shape
    DecodeError(String),
    /// The peer answered with an application error
    Rejected(Rejection),
    /// I/O error on an established connection
    IoError(io::Error),
}

impl IpcError {
    /// Transport-equivalent failures: the façade may substitute a fallback
    pub fn is_transport(&self) -> bool {
        !matches!(self, IpcError::Rejected(_))
    }
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpcError::PeerUnreachable(msg) => write!(f, "Peer unreachable: {}", msg),
            IpcError::Timeout => write!(f, "Peer did not reply in time"),
            IpcError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            IpcError::DecodeError(msg) => write!(f, "Malformed reply: {}", msg),
            IpcError::Rejected(rejection) => write!(f, "{}", rejection.message),
            IpcError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for IpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpcError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IpcError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => {
                IpcError::PeerUnreachable(err.to_string())
            }
            _ => IpcError::IoError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_socket_is_unreachable() {
        let err = IpcError::from(io::Error::new(io::ErrorKind::NotFound, "no socket"));
        assert!(matches!(err, IpcError::PeerUnreachable(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn test_rejection_is_not_transport() {
        let err = IpcError::Rejected(Rejection::not_found("channel x"));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "channel x");
    }

    #[test]
    fn test_rejection_kind_wire_names() {
        assert_eq!(RejectionKind::from_wire("not_found"), RejectionKind::NotFound);
        assert_eq!(RejectionKind::from_wire("already_exists"), RejectionKind::Conflict);
        assert_eq!(RejectionKind::from_wire("whatever"), RejectionKind::Refused);
        assert_eq!(RejectionKind::Conflict.as_wire(), "conflict");
    }

    #[test]
    fn test_directory_resolves_each_peer() {
        let directory = PeerDirectory::from_config(&PeersConfig::default());
        assert_eq!(
            directory.endpoint(Peer::Tunnel).timeout,
            Duration::from_millis(4000)
        );
        assert!(directory.endpoint(Peer::Broker).address.contains("mqbc"));
        assert_eq!(Peer::Bridge.as_ref(), "bridge");
    }
}
