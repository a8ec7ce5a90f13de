//! Cloud-tunnel port mapping
//!
//! The tunnel client reports its active mappings as
//! `[local_port, protocol, remote_port]` triplets. HTTPS access means the
//! local web port is mapped; SSH access means remote port 22 is mapped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::Result;
use crate::system::ipc::{Command, Peer, RequestReplyClient};

const HTTPS_LOCAL_PORT: u64 = 443;
const SSH_REMOTE_PORT: u64 = 22;
/// Reply by which the tunnel client confirms a command
const CONFIRMED: &str = "OK";

/// Remote access flags; `None` when the tunnel client could not be asked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStatus {
    pub https: Option<bool>,
    pub ssh: Option<bool>,
}

impl TunnelStatus {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Requested change; absent flags are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TunnelUpdate {
    #[serde(default)]
    pub https: Option<bool>,
    #[serde(default)]
    pub ssh: Option<bool>,
}

impl TunnelUpdate {
    fn commands(&self) -> Vec<&'static str> {
        let mut commands = Vec::with_capacity(2);
        if let Some(https) = self.https {
            commands.push(if https { "https_on" } else { "https_off" });
        }
        if let Some(ssh) = self.ssh {
            commands.push(if ssh { "ssh_on" } else { "ssh_off" });
        }
        commands
    }
}

/// Parse the `info` reply; `None` if any mapping is malformed
pub fn parse_mappings(doc: &Value) -> Option<Vec<(u64, String, u64)>> {
    doc.as_array()?
        .iter()
        .map(|mapping| match mapping.as_array()?.as_slice() {
            [local, proto, remote] => Some((
                local.as_u64()?,
                proto.as_str().unwrap_or_default().to_string(),
                remote.as_u64()?,
            )),
            _ => None,
        })
        .collect()
}

pub struct TunnelPortMapping {
    client: Arc<RequestReplyClient>,
}

impl TunnelPortMapping {
    pub fn new(client: Arc<RequestReplyClient>) -> Self {
        Self { client }
    }

    pub async fn read(&self) -> TunnelStatus {
        let doc = match self
            .client
            .document(Peer::Tunnel, &Command::control("info"))
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Tunnel client info unavailable: {}", e);
                return TunnelStatus::unknown();
            }
        };

        let Some(mappings) = parse_mappings(&doc) else {
            warn!("Tunnel client sent malformed port mappings: {}", doc);
            return TunnelStatus::unknown();
        };

        TunnelStatus {
            https: Some(mappings.iter().any(|(local, _, _)| *local == HTTPS_LOCAL_PORT)),
            ssh: Some(mappings.iter().any(|(_, _, remote)| *remote == SSH_REMOTE_PORT)),
        }
    }

    /// Apply `update`, https first; stops at the first unconfirmed command
    pub async fn write(&self, update: TunnelUpdate) -> Result<()> {
        for name in update.commands() {
            self.client
                .confirm(Peer::Tunnel, &Command::control(name), CONFIRMED)
                .await
                .inspect_err(|e| warn!("Tunnel command {} failed: {}", name, e))?;
            info!("Tunnel command {} applied", name);
        }
        Ok(())
    }
}
