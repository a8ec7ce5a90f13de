//! Mirrored authentication toggle
//!
//! The broker and the bridge each enforce API authentication on their own
//! listeners and must agree on it. A change goes to the broker first, then
//! to the bridge; if the bridge refuses, the broker is put back.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::errors::GnodeError;
use crate::system::ipc::{Command, IpcError, Peer, RequestReplyClient};

/// Reply by which a peer confirms the change
const CONFIRMED: &str = "ok";

fn auth_command(enabled: bool) -> Command {
    Command::replace(if enabled {
        "set_api_auth_on"
    } else {
        "set_api_auth_off"
    })
}

/// Progress of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    Applying,
    Confirmed,
    /// The broker refused; nothing changed
    Unchanged,
    /// The bridge refused and the broker was restored
    RolledBack,
    /// The bridge refused and restoring the broker failed too
    Inconsistent,
}

/// Final result of a toggle
#[derive(Debug)]
pub enum ToggleOutcome {
    Confirmed,
    Unchanged { cause: IpcError },
    RolledBack { cause: IpcError },
    Inconsistent { cause: IpcError, rollback: IpcError },
}

impl ToggleOutcome {
    pub fn state(&self) -> ToggleState {
        match self {
            ToggleOutcome::Confirmed => ToggleState::Confirmed,
            ToggleOutcome::Unchanged { .. } => ToggleState::Unchanged,
            ToggleOutcome::RolledBack { .. } => ToggleState::RolledBack,
            ToggleOutcome::Inconsistent { .. } => ToggleState::Inconsistent,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ToggleOutcome::Confirmed)
    }

    pub fn into_result(self) -> Result<(), GnodeError> {
        match self {
            ToggleOutcome::Confirmed => Ok(()),
            ToggleOutcome::Unchanged { cause } => Err(cause.into()),
            ToggleOutcome::RolledBack { cause } => Err(GnodeError::rolled_back(format!(
                "Bridge refused the authentication change ({}); broker restored",
                cause
            ))),
            ToggleOutcome::Inconsistent { cause, rollback } => {
                Err(GnodeError::inconsistent(format!(
                    "Bridge refused the authentication change ({}) and restoring the broker failed ({})",
                    cause, rollback
                )))
            }
        }
    }
}

pub struct MirroredToggle {
    client: Arc<RequestReplyClient>,
}

impl MirroredToggle {
    pub fn new(client: Arc<RequestReplyClient>) -> Self {
        Self { client }
    }

    /// Move both peers from `previous` to `desired`
    pub async fn apply(&self, previous: bool, desired: bool) -> ToggleOutcome {
        debug!(
            "API authentication toggle {:?}: {} -> {}",
            ToggleState::Applying,
            previous,
            desired
        );

        if let Err(cause) = self
            .client
            .confirm(Peer::Broker, &auth_command(desired), CONFIRMED)
            .await
        {
            warn!("Broker refused api_authentication={}: {}", desired, cause);
            return ToggleOutcome::Unchanged { cause };
        }

        let cause = match self
            .client
            .confirm(Peer::Bridge, &auth_command(desired), CONFIRMED)
            .await
        {
            Ok(()) => {
                info!("API authentication set to {} on broker and bridge", desired);
                return ToggleOutcome::Confirmed;
            }
            Err(cause) => cause,
        };

        warn!(
            "Bridge refused api_authentication={}: {}, restoring broker",
            desired, cause
        );

        match self
            .client
            .confirm(Peer::Broker, &auth_command(previous), CONFIRMED)
            .await
        {
            Ok(()) => ToggleOutcome::RolledBack { cause },
            Err(rollback) => {
                error!(
                    "Broker and bridge disagree on api_authentication: restore failed: {}",
                    rollback
                );
                ToggleOutcome::Inconsistent { cause, rollback }
            }
        }
    }
}
