//! Broker-wide settings
//!
//! Only anonymous access is exposed for now. The broker answers a poll with
//! one flag byte and takes a new value as a single switch byte.

use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::Result;
use crate::system::ipc::{Command, Peer, RequestReplyClient};

const ALLOW_ANONYMOUS: &str = "allow_anonymous";

pub struct BrokerSettings {
    client: Arc<RequestReplyClient>,
}

impl BrokerSettings {
    pub fn new(client: Arc<RequestReplyClient>) -> Self {
        Self { client }
    }

    /// Whether the broker accepts anonymous clients; `false` if it cannot be asked
    pub async fn allow_anonymous(&self) -> bool {
        self.client
            .flag(Peer::Broker, &Command::poll())
            .await
            .unwrap_or_else(|e| {
                warn!("Reading {} failed: {}", ALLOW_ANONYMOUS, e);
                false
            })
    }

    /// The broker's reply carries no status; only a failed exchange is an error
    pub async fn set_allow_anonymous(&self, allow: bool) -> Result<()> {
        self.client
            .send(Peer::Broker, &Command::switch(allow))
            .await
            .inspect_err(|e| warn!("Writing {} failed: {}", ALLOW_ANONYMOUS, e))?;
        info!("Broker allow_anonymous set to {}", allow);
        Ok(())
    }
}
