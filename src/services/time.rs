//! System time and timezone
//!
//! Physical devices read time settings from `timedatectl` and sync through
//! chrony; containers only report the clock of the host.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DeviceMode;
use crate::errors::{GnodeError, Result};
use crate::system::command::{CommandError, CommandRunner};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeInfo {
    pub timestamp: f64,
    pub iso8601: String,
    pub timezone: String,
    pub auto: bool,
}

/// Requested time change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeUpdate {
    #[serde(default)]
    pub automatic: bool,
    pub date: Option<String>,
    pub time: Option<String>,
    pub timezone: Option<String>,
    pub ntp_server: Option<String>,
}

/// `(ntp enabled, timezone)` from `timedatectl show`
pub fn parse_timedatectl(output: &str) -> (bool, Option<String>) {
    let mut auto = false;
    let mut timezone = None;
    for (key, value) in output.lines().filter_map(|l| l.split_once('=')) {
        match key.trim() {
            "NTP" => auto = value.trim() == "yes",
            "Timezone" => timezone = Some(value.trim().to_string()),
            _ => {}
        }
    }
    (auto, timezone)
}

/// Remote addresses listed by `chronyc ntpdata`
pub fn parse_ntp_sources(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("Remote address"))
        .filter_map(|line| line.split_once(':').map(|(_, rest)| rest))
        .map(|addr| addr.split_whitespace().next().unwrap_or_default().to_string())
        .filter(|addr| !addr.is_empty())
        .collect()
}

pub struct TimeService {
    runner: Arc<dyn CommandRunner>,
    mode: DeviceMode,
}

impl TimeService {
    pub fn new(runner: Arc<dyn CommandRunner>, mode: DeviceMode) -> Self {
        Self { runner, mode }
    }

    pub async fn current(&self) -> Result<TimeInfo> {
        let (auto, timezone) = match self.mode {
            DeviceMode::Virtual => {
                let target = tokio::fs::read_link("/etc/localtime").await?;
                let target = target.to_string_lossy();
                let zone = target
                    .split_once("/zoneinfo/")
                    .map(|(_, zone)| zone.to_string())
                    .ok_or_else(|| {
                        GnodeError::internal(format!(
                            "Unexpected /etc/localtime target: {}",
                            target
                        ))
                    })?;
                (false, zone)
            }
            DeviceMode::Physical => {
                let out = self.runner.run("timedatectl", &["show"]).await?;
                let (auto, zone) = parse_timedatectl(&out);
                let zone =
                    zone.ok_or_else(|| GnodeError::internal("timedatectl reported no timezone"))?;
                (auto, zone)
            }
        };

        let now = Local::now();
        Ok(TimeInfo {
            timestamp: now.timestamp_millis() as f64 / 1000.0,
            iso8601: now.format("%Y-%m-%dT%H:%M:%S%z").to_string(),
            timezone,
            auto,
        })
    }

    pub async fn timezones(&self) -> Vec<String> {
        match self.runner.run("timedatectl", &["list-timezones"]).await {
            Ok(out) => out.lines().map(str::to_string).collect(),
            Err(e) => {
                warn!("Listing timezones failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn apply(&self, update: &TimeUpdate) -> Result<()> {
        if self.mode == DeviceMode::Virtual {
            return Err(GnodeError::feature_disabled(
                "Time settings are not available in virtual mode.",
            ));
        }

        let missing = || GnodeError::validation("Missing required field!");
        let timezone = update.timezone.as_deref().filter(|s| !s.is_empty());

        if update.automatic {
            let timezone = timezone.ok_or_else(missing)?;
            self.set_automatic(update.ntp_server.as_deref(), timezone)
                .await?;
        } else {
            let (Some(date), Some(time), Some(timezone)) = (
                update.date.as_deref().filter(|s| !s.is_empty()),
                update.time.as_deref().filter(|s| !s.is_empty()),
                timezone,
            ) else {
                return Err(missing());
            };
            self.set_manual(&format!("{} {}", date, time), timezone)
                .await
                .map_err(|e| {
                    warn!("{}", e);
                    GnodeError::command_failed("Failed to set system time!")
                })?;
        }

        self.runner
            .run_privileged("hwclock", &["--systohc", "--utc"])
            .await?;
        Ok(())
    }

    async fn set_timezone(&self, timezone: &str) -> std::result::Result<(), CommandError> {
        self.runner
            .run_privileged("timedatectl", &["set-local-rtc", "0"])
            .await?;
        self.runner
            .run_privileged("timedatectl", &["set-timezone", timezone])
            .await?;
        self.runner
            .run_privileged(
                "env",
                &[
                    "DEBIAN_FRONTEND=noninteractive",
                    "/usr/sbin/dpkg-reconfigure",
                    "tzdata",
                ],
            )
            .await?;
        Ok(())
    }

    async fn set_manual(
        &self,
        date_time: &str,
        timezone: &str,
    ) -> std::result::Result<(), CommandError> {
        self.runner
            .run_privileged("timedatectl", &["set-ntp", "false"])
            .await?;
        self.set_timezone(timezone).await?;
        self.runner
            .run_privileged("date", &["--set", date_time])
            .await?;
        info!("System time set manually to {} ({})", date_time, timezone);
        Ok(())
    }

    async fn set_automatic(&self, ntp_server: Option<&str>, timezone: &str) -> Result<()> {
        let failed = |e: CommandError| {
            warn!("{}", e);
            if e.stderr.contains("Invalid host/IP address") {
                GnodeError::command_failed("Invalid NTP server address")
            } else {
                GnodeError::command_failed("Failed to sync system time")
            }
        };

        self.set_timezone(timezone).await.map_err(failed)?;
        self.runner
            .run_privileged("systemctl", &["restart", "chrony.service"])
            .await
            .map_err(failed)?;

        if let Some(server) = ntp_server.filter(|s| !s.is_empty()) {
            let sources = self
                .runner
                .run_privileged("chronyc", &["ntpdata"])
                .await
                .map_err(|_| GnodeError::command_failed("Failed to remove old servers!"))?;
            for old in parse_ntp_sources(&sources) {
                self.runner
                    .run_privileged("chronyc", &["delete", &old])
                    .await
                    .map_err(|_| GnodeError::command_failed("Failed to remove old servers!"))?;
            }
            self.runner
                .run_privileged("chronyc", &["add", "server", server, "iburst"])
                .await
                .map_err(failed)?;
            self.runner
                .run_privileged("chronyc", &["makestep"])
                .await
                .map_err(failed)?;
        }

        info!("System time synchronised automatically ({})", timezone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timedatectl() {
        let out = "Timezone=Europe/Stockholm\nLocalRTC=no\nCanNTP=yes\nNTP=yes\nNTPSynchronized=yes";
        assert_eq!(
            parse_timedatectl(out),
            (true, Some("Europe/Stockholm".to_string()))
        );
        assert_eq!(parse_timedatectl("NTP=no"), (false, None));
    }

    #[test]
    fn test_parse_ntp_sources() {
        let out = "Remote address  : 192.0.2.10 (C000020A)\nRemote port     : 123\n\nRemote address  : 198.51.100.1 (C6336401)";
        assert_eq!(parse_ntp_sources(out), vec!["192.0.2.10", "198.51.100.1"]);
    }
}
