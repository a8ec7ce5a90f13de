//! Version and identity reporting
//!
//! The combined API version is `<gnode>.<bridge>.<broker>`; a peer that does
//! not answer contributes `xxxx`.

use futures_util::future::join;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::config::{DeviceMode, SystemConfig};
use crate::errors::{GnodeError, Result};
use crate::system::ipc::{Command, Peer, RequestReplyClient};

/// Placeholder for a version that could not be read
pub const UNKNOWN_VERSION: &str = "xxxx";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionReport {
    pub api_version: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub mode: DeviceMode,
    pub version: String,
    pub serial_number: String,
}

pub struct VersionInfo {
    client: Arc<RequestReplyClient>,
    mode: DeviceMode,
    api_version_path: PathBuf,
    serial_number_path: PathBuf,
}

impl VersionInfo {
    pub fn new(client: Arc<RequestReplyClient>, system: &SystemConfig) -> Self {
        Self {
            client,
            mode: system.device_mode(),
            api_version_path: PathBuf::from(&system.api_version_path),
            serial_number_path: PathBuf::from(&system.serial_number_path),
        }
    }

    async fn peer_version(&self, peer: Peer) -> String {
        match self
            .client
            .text(peer, &Command::control("api_version"))
            .await
        {
            Ok(version) => version.trim().to_string(),
            Err(e) => {
                warn!("{} api_version unavailable: {}", peer.as_ref(), e);
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    async fn read_file(path: &Path, what: &str) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map(|s| s.trim().to_string())
            .map_err(|e| {
                GnodeError::file_operation(format!(
                    "Cannot read {} from {}: {}",
                    what,
                    path.display(),
                    e
                ))
            })
    }

    /// `<gnode>.<bridge>.<broker>`
    pub async fn api_version(&self) -> Result<String> {
        let gnode = Self::read_file(&self.api_version_path, "API version").await?;
        let (bridge, broker) = join(
            self.peer_version(Peer::Bridge),
            self.peer_version(Peer::Broker),
        )
        .await;
        Ok(format!("{}.{}.{}", gnode, bridge, broker))
    }

    pub async fn serial_number(&self) -> Result<String> {
        Self::read_file(&self.serial_number_path, "serial number").await
    }

    pub async fn report(&self) -> Result<VersionReport> {
        Ok(VersionReport {
            api_version: self.api_version().await?,
            serial_number: self.serial_number().await?,
        })
    }

    pub async fn info(&self) -> Result<DeviceInfo> {
        let report = self.report().await?;
        Ok(DeviceInfo {
            mode: self.mode,
            version: report.api_version,
            serial_number: report.serial_number,
        })
    }
}
