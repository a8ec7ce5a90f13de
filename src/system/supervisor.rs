//! Service supervision
//!
//! Physical devices manage sibling services with systemd; containers run them
//! under supervisord.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::command::{CommandError, CommandRunner};
use crate::config::DeviceMode;

/// Reported state of a managed service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Malformed,
    Stopped,
    Running,
    Failed,
}

/// Map `systemctl show --property=ActiveState,SubState,LoadState` output
pub fn parse_systemd_status(output: &str) -> ServiceStatus {
    let props: HashMap<&str, &str> = output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    let Some(load) = props.get("LoadState").copied() else {
        return ServiceStatus::Malformed;
    };
    let active = props.get("ActiveState").copied().unwrap_or_default();
    let sub = props.get("SubState").copied().unwrap_or_default();

    match (load, active) {
        ("not-found" | "masked", _) => ServiceStatus::Malformed,
        ("loaded", "active") if sub == "running" => ServiceStatus::Running,
        ("loaded", "active") => ServiceStatus::Stopped,
        ("loaded", "failed") => ServiceStatus::Failed,
        ("loaded", _) => ServiceStatus::Stopped,
        _ => ServiceStatus::Failed,
    }
}

/// Map `supervisorctl status <name>` output
pub fn parse_supervisor_status(output: &str) -> ServiceStatus {
    match output.split_whitespace().nth(1) {
        Some("RUNNING") => ServiceStatus::Running,
        Some("STOPPED") => ServiceStatus::Stopped,
        _ => ServiceStatus::Malformed,
    }
}

/// Queries and controls sibling services through the OS supervisor
pub struct ServiceSupervisor {
    runner: Arc<dyn CommandRunner>,
    mode: DeviceMode,
}

impl ServiceSupervisor {
    pub fn new(runner: Arc<dyn CommandRunner>, mode: DeviceMode) -> Self {
        Self { runner, mode }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Current status of `unit`; command failures read as malformed
    pub async fn status(&self, unit: &str) -> ServiceStatus {
        match self.mode {
            DeviceMode::Physical => {
                match self
                    .runner
                    .run(
                        "systemctl",
                        &["show", unit, "--property=ActiveState,SubState,LoadState"],
                    )
                    .await
                {
                    Ok(out) => parse_systemd_status(&out),
                    Err(e) => {
                        warn!("systemctl show {} failed: {}", unit, e);
                        ServiceStatus::Malformed
                    }
                }
            }
            DeviceMode::Virtual => match self.runner.run("supervisorctl", &["status", unit]).await
            {
                Ok(out) => parse_supervisor_status(&out),
                Err(e) => {
                    warn!("supervisorctl status {} failed: {}", unit, e);
                    ServiceStatus::Malformed
                }
            },
        }
    }

    pub async fn enable_and_start(&self, unit: &str) -> Result<(), CommandError> {
        match self.mode {
            DeviceMode::Physical => {
                self.runner
                    .run_privileged("systemctl", &["enable", unit])
                    .await?;
                self.runner
                    .run_privileged("systemctl", &["start", unit])
                    .await?;
            }
            DeviceMode::Virtual => {
                self.runner
                    .run_privileged("supervisorctl", &["start", unit])
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn stop_and_disable(&self, unit: &str) -> Result<(), CommandError> {
        match self.mode {
            DeviceMode::Physical => {
                self.runner
                    .run_privileged("systemctl", &["stop", unit])
                    .await?;
                self.runner
                    .run_privileged("systemctl", &["disable", unit])
                    .await?;
            }
            DeviceMode::Virtual => {
                self.runner
                    .run_privileged("supervisorctl", &["stop", unit])
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(load: &str, active: &str, sub: &str) -> String {
        format!("ActiveState={active}\nSubState={sub}\nLoadState={load}")
    }

    #[test]
    fn test_systemd_status_table() {
        assert_eq!(
            parse_systemd_status(&show("loaded", "active", "running")),
            ServiceStatus::Running
        );
        assert_eq!(
            parse_systemd_status(&show("loaded", "active", "exited")),
            ServiceStatus::Stopped
        );
        assert_eq!(
            parse_systemd_status(&show("loaded", "failed", "failed")),
            ServiceStatus::Failed
        );
        assert_eq!(
            parse_systemd_status(&show("loaded", "inactive", "dead")),
            ServiceStatus::Stopped
        );
        assert_eq!(
            parse_systemd_status(&show("not-found", "inactive", "dead")),
            ServiceStatus::Malformed
        );
        assert_eq!(
            parse_systemd_status(&show("masked", "inactive", "dead")),
            ServiceStatus::Malformed
        );
        assert_eq!(
            parse_systemd_status(&show("error", "inactive", "dead")),
            ServiceStatus::Failed
        );
        assert_eq!(parse_systemd_status(""), ServiceStatus::Malformed);
    }

    #[test]
    fn test_supervisor_status() {
        assert_eq!(
            parse_supervisor_status("mqbc   RUNNING   pid 12, uptime 0:01:00"),
            ServiceStatus::Running
        );
        assert_eq!(
            parse_supervisor_status("mqbc   STOPPED   Not started"),
            ServiceStatus::Stopped
        );
        assert_eq!(
            parse_supervisor_status("mqbc   FATAL   Exited too quickly"),
            ServiceStatus::Malformed
        );
        assert_eq!(parse_supervisor_status(""), ServiceStatus::Malformed);
    }
}
