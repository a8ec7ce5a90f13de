//! Network configuration through NetworkManager
//!
//! Reads and changes Wi-Fi, access point and IPv4 settings with `nmcli`.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{GnodeError, Result};
use crate::system::command::{CommandError, CommandRunner};
use crate::system::supervisor::{ServiceStatus, ServiceSupervisor};

type CommandResult<T> = std::result::Result<T, CommandError>;

/// Parse `nmcli -m multiline` output into records
///
/// A record starts whenever the first field name of the output repeats.
/// Field names are lowercased; `--` means empty.
pub fn parse_multiline(output: &str) -> Vec<Map<String, Value>> {
    let mut records = Vec::new();
    let mut current = Map::new();
    let mut first_key: Option<String> = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = match value.trim() {
            "--" => "",
            v => v,
        };

        let first = first_key.get_or_insert_with(|| key.clone());
        if *first == key && !current.is_empty() {
            records.push(std::mem::take(&mut current));
        }
        current.insert(key, Value::String(value.to_string()));
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

fn field<'a>(record: &'a Map<String, Value>, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn parse_netmask(mask: &str) -> Option<u32> {
    let bits = u32::from(mask.parse::<Ipv4Addr>().ok()?);
    // ones followed by zeros only
    (bits.leading_ones() + bits.trailing_zeros() == 32).then_some(bits)
}

/// Dotted netmask → prefix length
pub fn netmask_to_cidr(mask: &str) -> Option<u32> {
    parse_netmask(mask).map(u32::leading_ones)
}

/// `a.b.c.d/len` → (address, dotted netmask)
pub fn cidr_to_ip_and_netmask(cidr: &str) -> Option<(String, String)> {
    let (addr, len) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let len: u32 = len.parse().ok()?;
    if len > 32 {
        return None;
    }
    let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
    Some((addr.to_string(), Ipv4Addr::from(mask).to_string()))
}

/// Usable unicast host address
pub fn is_valid_ipv4_address(value: &str) -> bool {
    match value.parse::<Ipv4Addr>() {
        Ok(ip) => {
            !(ip.is_loopback()
                || ip.is_multicast()
                || ip.is_unspecified()
                || ip.octets()[0] >= 240)
        }
        Err(_) => false,
    }
}

pub fn is_valid_subnet_mask(value: &str) -> bool {
    parse_netmask(value).is_some()
}

/// Gateway inside the network and neither its network nor broadcast address
pub fn is_valid_gateway(gateway: &str, address: &str, netmask: &str) -> bool {
    let (Ok(ip), Some(mask)) = (address.parse::<Ipv4Addr>(), parse_netmask(netmask)) else {
        return false;
    };
    if !is_valid_ipv4_address(gateway) {
        return false;
    }
    let Ok(gw) = gateway.parse::<Ipv4Addr>() else {
        return false;
    };

    let network = u32::from(ip) & mask;
    let broadcast = network | !mask;
    let gw = u32::from(gw);
    gw & mask == network && gw != network && gw != broadcast
}

/// Static IPv4 configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ipv4Settings {
    pub address: String,
    pub netmask: String,
    pub gateway: String,
    pub dns: String,
}

impl Ipv4Settings {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|_| {
            GnodeError::validation(
                "Invalid ipv4 settings: ipv4_settings should contain only address, netmask, dns and gateway",
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |what: &str| {
            Err(GnodeError::validation(format!(
                "Invalid ipv4 settings: invalid {}",
                what
            )))
        };
        if !is_valid_ipv4_address(&self.address) {
            return fail("address");
        }
        if !is_valid_subnet_mask(&self.netmask) {
            return fail("netmask");
        }
        if !is_valid_gateway(&self.gateway, &self.address, &self.netmask) {
            return fail("gateway");
        }
        if !is_valid_ipv4_address(&self.dns) {
            return fail("dns");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Method {
    Auto,
    Manual,
}

/// Requested network change; absent keys are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkUpdate {
    pub ap_state: Option<String>,
    pub wifi_state: Option<String>,
    #[serde(rename = "type")]
    pub connection_type: Option<String>,
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub ipv4_method: Option<String>,
    pub ipv4_settings: Option<Value>,
}

impl NetworkUpdate {
    fn method(&self) -> Result<Option<Ipv4Method>> {
        match self.ipv4_method.as_deref() {
            None => Ok(None),
            Some("auto") => Ok(Some(Ipv4Method::Auto)),
            Some("manual") => Ok(Some(Ipv4Method::Manual)),
            Some(_) => Err(GnodeError::validation("ipv4_method should be auto or manual")),
        }
    }
}

pub struct NetworkService {
    runner: Arc<dyn CommandRunner>,
    supervisor: Arc<ServiceSupervisor>,
    ap_unit: String,
}

impl NetworkService {
    pub fn new(supervisor: Arc<ServiceSupervisor>, ap_unit: impl Into<String>) -> Self {
        Self {
            runner: supervisor.runner().clone(),
            supervisor,
            ap_unit: ap_unit.into(),
        }
    }

    async fn nmcli_records(&self, args: &[&str]) -> CommandResult<Vec<Map<String, Value>>> {
        let out = self.runner.run_privileged("nmcli", args).await?;
        Ok(parse_multiline(&out))
    }

    async fn ap_state(&self) -> &'static str {
        if self.supervisor.status(&self.ap_unit).await == ServiceStatus::Running {
            "enabled"
        } else {
            "disabled"
        }
    }

    async fn available_wifi(&self) -> CommandResult<Vec<Map<String, Value>>> {
        self.nmcli_records(&[
            "-m",
            "multiline",
            "-f",
            "SSID,SECURITY,DEVICE,SIGNAL,RATE",
            "device",
            "wifi",
            "list",
        ])
        .await
    }

    async fn connections(&self, active: bool) -> CommandResult<Vec<Map<String, Value>>> {
        let mut args = vec!["-m", "multiline", "-f", "NAME,TYPE,DEVICE", "connection", "show"];
        if active {
            args.push("--active");
        }
        self.nmcli_records(&args).await
    }

    async fn ipv4_method(&self, connection: &str) -> CommandResult<String> {
        self.runner
            .run_privileged(
                "nmcli",
                &["-g", "ipv4.method", "connection", "show", connection],
            )
            .await
    }

    /// IPv4 configuration currently applied to `device`
    pub async fn ipv4_settings(&self, device: &str) -> CommandResult<Value> {
        let records = self.nmcli_records(&["device", "show", device]).await?;
        let record = records.into_iter().next().unwrap_or_default();

        let mut settings = Map::new();
        if let Some((address, netmask)) = cidr_to_ip_and_netmask(field(&record, "ip4.address[1]"))
        {
            settings.insert("address".into(), Value::String(address));
            settings.insert("netmask".into(), Value::String(netmask));
        }
        settings.insert(
            "gateway".into(),
            Value::String(field(&record, "ip4.gateway").to_string()),
        );
        settings.insert(
            "dns".into(),
            record.get("ip4.dns[1]").cloned().unwrap_or(Value::Null),
        );
        Ok(Value::Object(settings))
    }

    /// Active connections of the given types with their IPv4 details
    async fn active_connections(&self, types: &[&str]) -> CommandResult<Vec<Map<String, Value>>> {
        let mut relevant = Vec::new();
        for mut connection in self.connections(true).await? {
            if !types.contains(&field(&connection, "type")) {
                continue;
            }
            let method = self.ipv4_method(field(&connection, "name")).await?;
            let settings = self.ipv4_settings(field(&connection, "device")).await?;
            connection.insert("ipv4_method".into(), Value::String(method));
            connection.insert("ipv4_settings".into(), settings);
            relevant.push(connection);
        }
        Ok(relevant)
    }

    /// Everything the settings page shows about networking
    ///
    /// A failing command stops the collection and sets
    /// `fetching_status` to `failure`; what was gathered so far is kept.
    pub async fn settings(&self) -> Value {
        let mut out = Map::new();
        out.insert("ap_state".into(), json!(self.ap_state().await));

        let result = async {
            let wifi = self.runner.run("nmcli", &["radio", "wifi"]).await?;
            out.insert("wifi_state".into(), json!(wifi));
            let ethernet = self.runner.run("nmcli", &["networking"]).await?;
            out.insert("ethernet_state".into(), json!(ethernet));
            out.insert("available_wifi".into(), json!(self.available_wifi().await?));
            let wired: Vec<_> = self
                .connections(false)
                .await?
                .into_iter()
                .filter(|c| field(c, "type") == "ethernet")
                .collect();
            out.insert("available_ethernet".into(), json!(wired));
            out.insert(
                "active_connections".into(),
                json!(self.active_connections(&["ethernet", "wifi"]).await?),
            );
            Ok::<(), CommandError>(())
        }
        .await;

        let status = match result {
            Ok(()) => "success",
            Err(e) => {
                warn!("Fetching network settings failed: {}", e);
                "failure"
            }
        };
        out.insert("fetching_status".into(), json!(status));
        Value::Object(out)
    }

    /// IPv4 settings of the device carrying the default route
    pub async fn status(&self) -> Result<Value> {
        let unknown = json!({"ipv4": "-", "netmask": "-", "gateway": "-", "dns": "-"});

        let routes = self
            .runner
            .run("ip", &["-j", "route"])
            .await
            .map_err(|_| GnodeError::command_failed("Could not get network status!"))?;
        let routes: Vec<Value> = serde_json::from_str(&routes)?;

        let Some(device) = routes
            .iter()
            .find(|r| r.get("dst").and_then(Value::as_str) == Some("default"))
            .and_then(|r| r.get("dev"))
            .and_then(Value::as_str)
        else {
            return Ok(unknown);
        };

        self.ipv4_settings(device)
            .await
            .map_err(|_| GnodeError::command_failed("Could not get network status!"))
    }

    /// Apply a network change: AP, Wi-Fi radio, Wi-Fi network, then IPv4
    pub async fn apply(&self, update: &NetworkUpdate) -> Result<()> {
        let method = update.method()?;

        if let Some(ap) = &update.ap_state {
            if ap == "enabled" {
                self.supervisor.enable_and_start(&self.ap_unit).await?;
            } else {
                self.supervisor.stop_and_disable(&self.ap_unit).await?;
            }
            info!("Access point state set to {}", ap);
        }

        if let Some(wifi) = &update.wifi_state {
            let state = if wifi == "enabled" { "on" } else { "off" };
            self.runner
                .run_privileged("nmcli", &["radio", "wifi", state])
                .await?;
        }

        if let Some(ssid) = &update.ssid {
            self.connect_wifi(ssid, update.password.as_deref()).await?;
        }

        if let Some(method) = method {
            self.set_ipv4(method, update).await?;
        }
        Ok(())
    }

    async fn connect_wifi(&self, ssid: &str, password: Option<&str>) -> Result<()> {
        let networks = self.available_wifi().await?;
        let selected = networks
            .iter()
            .find(|n| field(n, "ssid") == ssid)
            .ok_or_else(|| GnodeError::not_found("Network settings: Given ssid is invalid"))?;

        let current = self.active_connections(&["wifi"]).await?;
        if current.first().is_some_and(|c| field(c, "name") == ssid) {
            return Ok(());
        }

        let mut args = vec!["device", "wifi", "connect", ssid];
        match password.filter(|p| !p.is_empty()) {
            Some(password) => args.extend(["password", password]),
            None if !field(selected, "security").is_empty() => {
                return Err(GnodeError::validation(
                    "Network settings: Given ssid requires a password",
                ));
            }
            None => {}
        }

        if let Err(e) = self.runner.run_privileged("nmcli", &args).await {
            if e.stderr.contains("property is invalid")
                || e.stderr.contains("Secrets were required")
            {
                return Err(GnodeError::validation("Password is invalid"));
            }
            if let Err(cleanup) = self
                .runner
                .run_privileged("nmcli", &["connection", "delete", "id", ssid])
                .await
            {
                warn!("Removing failed connection {} failed: {}", ssid, cleanup);
            }
            return Err(e.into());
        }

        info!("Connected to Wi-Fi network {}", ssid);
        Ok(())
    }

    async fn set_ipv4(&self, method: Ipv4Method, update: &NetworkUpdate) -> Result<()> {
        let manual = match method {
            Ipv4Method::Manual => {
                let raw = update
                    .ipv4_settings
                    .clone()
                    .unwrap_or(Value::Object(Map::new()));
                let settings = Ipv4Settings::from_value(&raw)?;
                settings.validate()?;
                Some(settings)
            }
            Ipv4Method::Auto => None,
        };

        let connection_type = update
            .connection_type
            .as_deref()
            .ok_or_else(|| GnodeError::validation("Network settings: type is required"))?;
        let connection = self
            .active_connections(&[connection_type])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GnodeError::validation("No active connections"))?;
        let name = field(&connection, "name").to_string();
        let device = field(&connection, "device").to_string();

        let mut commands: Vec<Vec<String>> = Vec::new();
        let modify = |key: &str, value: &str| {
            ["connection", "modify", name.as_str(), key, value]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };

        match &manual {
            None => {
                commands.push(modify("ipv4.method", "auto"));
                commands.push(modify("ipv4.gateway", ""));
                commands.push(modify("ipv4.dns", ""));
                commands.push(modify("ipv4.addresses", ""));
            }
            Some(settings) => {
                let prefix = netmask_to_cidr(&settings.netmask).ok_or_else(|| {
                    GnodeError::validation("Invalid ipv4 settings: invalid netmask")
                })?;
                commands.push(modify(
                    "ipv4.addresses",
                    &format!("{}/{}", settings.address, prefix),
                ));
                commands.push(modify("ipv4.gateway", &settings.gateway));
                commands.push(modify("ipv4.dns", &settings.dns));
                commands.push(modify("ipv4.method", "manual"));
            }
        }
        commands.push(vec!["device".into(), "reapply".into(), device]);

        for command in &commands {
            let args: Vec<&str> = command.iter().map(String::as_str).collect();
            self.runner
                .run_privileged("nmcli", &args)
                .await
                .map_err(|e| {
                    warn!("{}", e);
                    GnodeError::command_failed("Could not set network settings!")
                })?;
        }

        info!("IPv4 configuration of {} set to {:?}", name, method);
        Ok(())
    }
}
