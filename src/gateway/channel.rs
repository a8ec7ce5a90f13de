//! Channel registry
//!
//! Channels live in two peers: MQTT channels in the broker configurator and
//! HTTP channels in the bridge. Two LoRa Basic Station channels are backed by
//! local services instead and are synthesized here.
//!
//! The registry keeps an `id → kind` cache so single-channel operations can
//! be routed to the owning peer without listing everything first.

use futures_util::future::join;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{GnodeError, Result};
use crate::system::ipc::{Command, IpcError, Peer, RejectionKind, RequestReplyClient};
use crate::system::supervisor::{ServiceStatus, ServiceSupervisor};

/// Origin of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Mqtt,
    Http,
    Lora,
}

impl ChannelKind {
    /// Peer that owns channels of this kind; radio channels have none
    pub fn peer(self) -> Option<Peer> {
        match self {
            ChannelKind::Mqtt => Some(Peer::Broker),
            ChannelKind::Http => Some(Peer::Bridge),
            ChannelKind::Lora => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Mqtt => "mqtt",
            ChannelKind::Http => "http",
            ChannelKind::Lora => "lora",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mqtt" => Some(ChannelKind::Mqtt),
            "http" => Some(ChannelKind::Http),
            "lora" => Some(ChannelKind::Lora),
            _ => None,
        }
    }
}

/// Locally managed LoRa Basic Station channel
struct RadioChannel {
    id: &'static str,
    service: &'static str,
    port: u16,
    descr: &'static str,
}

const RADIO_CHANNELS: [RadioChannel; 2] = [
    RadioChannel {
        id: "lora_basic_station_ws",
        service: "chirpstack-gateway-bridge-ws",
        port: 3001,
        descr: "TCP",
    },
    RadioChannel {
        id: "lora_basic_station_wss",
        service: "chirpstack-gateway-bridge-wss",
        port: 8887,
        descr: "TLS",
    },
];

fn radio_channel(id: &str) -> Option<&'static RadioChannel> {
    RADIO_CHANNELS.iter().find(|radio| radio.id == id)
}

fn channel_path(id: &str) -> String {
    format!("channel/{}", id)
}

pub struct ChannelRegistry {
    client: Arc<RequestReplyClient>,
    supervisor: Arc<ServiceSupervisor>,
    kinds: Mutex<HashMap<String, ChannelKind>>,
}

impl ChannelRegistry {
    pub fn new(client: Arc<RequestReplyClient>, supervisor: Arc<ServiceSupervisor>) -> Self {
        Self {
            client,
            supervisor,
            kinds: Mutex::new(HashMap::new()),
        }
    }

    /// All channels of both peers plus the radio channels
    ///
    /// A peer that fails to answer contributes nothing to the listing. Each
    /// peer that answered replaces the cached ids of its kind; the cached ids
    /// of a peer that failed are kept.
    pub async fn list(&self) -> Vec<Value> {
        let (mqtt, http) = join(
            self.fetch(ChannelKind::Mqtt),
            self.fetch(ChannelKind::Http),
        )
        .await;

        let mut channels = Vec::with_capacity(RADIO_CHANNELS.len() + 16);
        {
            let mut kinds = self.kinds.lock();
            for (kind, records) in [(ChannelKind::Mqtt, mqtt), (ChannelKind::Http, http)] {
                let Some(records) = records else {
                    continue;
                };
                kinds.retain(|_, cached| *cached != kind);
                for (id, record) in records {
                    kinds.insert(id, kind);
                    channels.push(Value::Object(record));
                }
            }
        }

        for radio in &RADIO_CHANNELS {
            channels.push(self.radio_summary(radio).await);
        }

        channels
    }

    /// One channel, or `None` when no peer knows it
    pub async fn get(&self, id: &str) -> Result<Option<Value>> {
        if let Some(radio) = radio_channel(id) {
            return Ok(Some(self.radio_detail(radio).await));
        }

        let Some(kind) = self.resolve(id).await else {
            return Ok(None);
        };
        let Some(peer) = kind.peer() else {
            return Ok(None);
        };

        match self
            .client
            .document(peer, &Command::read(channel_path(id)))
            .await
        {
            Ok(mut doc) => {
                if let Value::Object(map) = &mut doc {
                    map.insert("type".into(), Value::String(kind.as_str().into()));
                }
                Ok(Some(doc))
            }
            Err(IpcError::Rejected(r)) if r.kind == RejectionKind::NotFound => {
                self.kinds.lock().remove(id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create(&self, id: &str, payload: Value) -> Result<()> {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GnodeError::validation("Missing channel type"))?;
        let kind = ChannelKind::parse(kind)
            .ok_or_else(|| GnodeError::validation(format!("Unknown channel type: {}", kind)))?;
        let peer = kind
            .peer()
            .ok_or_else(|| GnodeError::validation("Radio channels cannot be created"))?;
        if radio_channel(id).is_some() {
            return Err(GnodeError::validation(format!(
                "Channel id '{}' is reserved",
                id
            )));
        }

        self.client
            .acknowledge(peer, &Command::create(channel_path(id), payload))
            .await?;

        self.kinds.lock().insert(id.to_string(), kind);
        info!("Channel created: {} ({})", id, kind.as_str());
        Ok(())
    }

    pub async fn update(&self, id: &str, payload: Value) -> Result<()> {
        if let Some(radio) = radio_channel(id) {
            let enabled = payload
                .get("enabled")
                .and_then(Value::as_bool)
                .ok_or_else(|| GnodeError::validation("'enabled' must be a boolean"))?;
            if enabled {
                self.supervisor.enable_and_start(radio.service).await?;
            } else {
                self.supervisor.stop_and_disable(radio.service).await?;
            }
            info!("Radio channel {} enabled={}", id, enabled);
            return Ok(());
        }

        let peer = self.owner(id).await?;
        self.client
            .acknowledge(peer, &Command::replace(channel_path(id)).with_body(payload))
            .await?;
        info!("Channel updated: {}", id);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if radio_channel(id).is_some() {
            return Err(GnodeError::validation("Radio channels cannot be deleted"));
        }

        let peer = self.owner(id).await?;
        let result = self
            .client
            .acknowledge(peer, &Command::delete(channel_path(id)))
            .await;

        self.kinds.lock().remove(id);

        result?;
        info!("Channel deleted: {}", id);
        Ok(())
    }

    async fn owner(&self, id: &str) -> Result<Peer> {
        self.resolve(id)
            .await
            .and_then(ChannelKind::peer)
            .ok_or_else(|| GnodeError::not_found(format!("Channel not found: {}", id)))
    }

    /// Kind of `id` from the cache, re-listing once on a miss
    async fn resolve(&self, id: &str) -> Option<ChannelKind> {
        if radio_channel(id).is_some() {
            return Some(ChannelKind::Lora);
        }

        let cached = self.kinds.lock().get(id).copied();
        if cached.is_some() {
            return cached;
        }

        debug!("Channel {} not cached, refreshing", id);
        self.list().await;
        self.kinds.lock().get(id).copied()
    }

    /// Channel records of one peer, tagged with their kind
    ///
    /// `None` when the peer could not be listed.
    async fn fetch(&self, kind: ChannelKind) -> Option<Vec<(String, Map<String, Value>)>> {
        let peer = kind.peer()?;

        let doc = match self.client.document(peer, &Command::read("channel/")).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Listing {} channels failed: {}", kind.as_str(), e);
                return None;
            }
        };

        let Value::Array(items) = doc else {
            warn!("{} channel listing is not a list", kind.as_str());
            return None;
        };

        let records = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(mut record) => {
                    let id = record.get("id")?.as_str()?.to_string();
                    record.insert("type".into(), Value::String(kind.as_str().into()));
                    Some((id, record))
                }
                _ => None,
            })
            .collect();
        Some(records)
    }

    async fn radio_enabled(&self, radio: &RadioChannel) -> bool {
        self.supervisor.status(radio.service).await == ServiceStatus::Running
    }

    async fn radio_summary(&self, radio: &RadioChannel) -> Value {
        json!({
            "id": radio.id,
            "type": ChannelKind::Lora,
            "state": "CONFIGURED",
            "enabled": self.radio_enabled(radio).await,
        })
    }

    async fn radio_detail(&self, radio: &RadioChannel) -> Value {
        json!({
            "id": radio.id,
            "type": ChannelKind::Lora,
            "authtype": "none",
            "state": "CONFIGURED",
            "enabled": self.radio_enabled(radio).await,
            "ports": [{"port": radio.port, "descr": radio.descr}],
        })
    }
}
