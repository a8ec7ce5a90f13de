//! Service and network status report

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::network::NetworkService;
use crate::config::{DeviceMode, SystemConfig};
use crate::errors::Result;
use crate::system::supervisor::{ServiceStatus, ServiceSupervisor};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceReport {
    pub mqbc: ServiceStatus,
    pub m2eb: ServiceStatus,
    pub gcloud_client: ServiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub service: ServiceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Value>,
}

pub struct StatusService {
    supervisor: Arc<ServiceSupervisor>,
    network: Arc<NetworkService>,
    broker_unit: String,
    bridge_unit: String,
    tunnel_unit: String,
}

impl StatusService {
    pub fn new(
        supervisor: Arc<ServiceSupervisor>,
        network: Arc<NetworkService>,
        system: &SystemConfig,
    ) -> Self {
        Self {
            supervisor,
            network,
            broker_unit: system.broker_unit.clone(),
            bridge_unit: system.bridge_unit.clone(),
            tunnel_unit: system.tunnel_unit.clone(),
        }
    }

    /// Sibling service states, plus the default-route network on physical devices
    pub async fn report(&self) -> Result<StatusReport> {
        let service = ServiceReport {
            mqbc: self.supervisor.status(&self.broker_unit).await,
            m2eb: self.supervisor.status(&self.bridge_unit).await,
            gcloud_client: self.supervisor.status(&self.tunnel_unit).await,
        };

        let network = match self.supervisor.mode() {
            DeviceMode::Physical => Some(self.network.status().await?),
            DeviceMode::Virtual => None,
        };

        Ok(StatusReport { service, network })
    }
}
