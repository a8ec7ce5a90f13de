//! Device settings aggregate
//!
//! `GET /settings` gathers broker, time, network, authentication and tunnel
//! state into one document; `PUT /settings` applies each present key in turn.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::network::{NetworkService, NetworkUpdate};
use super::time::{TimeService, TimeUpdate};
use crate::errors::{GnodeError, Result};
use crate::gateway::{BrokerSettings, MirroredToggle, TunnelPortMapping, TunnelUpdate};
use crate::storage::SeaOrmStorage;

fn parse_key<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| GnodeError::validation(format!("Invalid value for {}: {}", key, e)))
}

pub struct SettingsService {
    storage: Arc<SeaOrmStorage>,
    toggle: Arc<MirroredToggle>,
    tunnel: Arc<TunnelPortMapping>,
    broker: Arc<BrokerSettings>,
    time: Arc<TimeService>,
    network: Arc<NetworkService>,
    /// 缓存的 api_authentication，供认证中间件无锁读取
    api_authentication: AtomicBool,
    /// 串行化认证开关的变更
    toggle_guard: Mutex<()>,
}

impl SettingsService {
    /// 加载（必要时创建）设置行，并在需要时同步兄弟服务的认证状态
    pub async fn init(
        storage: Arc<SeaOrmStorage>,
        toggle: Arc<MirroredToggle>,
        tunnel: Arc<TunnelPortMapping>,
        broker: Arc<BrokerSettings>,
        time: Arc<TimeService>,
        network: Arc<NetworkService>,
    ) -> Result<Self> {
        let (settings, created) = storage.load_or_create_settings().await?;

        // 新建时推送默认值；已关闭认证时确保两个对端一致
        if created || !settings.api_authentication {
            let value = settings.api_authentication;
            let outcome = toggle.apply(value, value).await;
            if !outcome.is_confirmed() {
                warn!(
                    "Could not synchronise api_authentication={} with peers: {:?}",
                    value,
                    outcome.state()
                );
            }
        }

        info!(
            "Settings loaded: api_authentication={}",
            settings.api_authentication
        );

        Ok(Self {
            storage,
            toggle,
            tunnel,
            broker,
            time,
            network,
            api_authentication: AtomicBool::new(settings.api_authentication),
            toggle_guard: Mutex::new(()),
        })
    }

    pub fn api_authentication(&self) -> bool {
        self.api_authentication.load(Ordering::Acquire)
    }

    /// 切换 API 认证：先同步对端，确认后才持久化
    ///
    /// 持久化失败时把对端改回原值；改回失败则缓存跟随对端的实际状态。
    pub async fn set_api_authentication(&self, desired: bool) -> Result<()> {
        let _guard = self.toggle_guard.lock().await;
        let previous = self.api_authentication();

        let outcome = self.toggle.apply(previous, desired).await;
        if !outcome.is_confirmed() {
            return outcome.into_result();
        }

        let saved = match self.storage.save_api_authentication(desired).await {
            Ok(_) => {
                self.api_authentication.store(desired, Ordering::Release);
                return Ok(());
            }
            Err(e) => e,
        };

        error!(
            "Persisting api_authentication={} failed: {}, reverting peers",
            desired, saved
        );

        let revert = self.toggle.apply(desired, previous).await;
        if revert.is_confirmed() {
            return Err(GnodeError::rolled_back(format!(
                "Saving the authentication change failed ({}); peers restored",
                saved
            )));
        }

        // 对端仍执行新值（或彼此不一致），以对端为准
        self.api_authentication.store(desired, Ordering::Release);
        Err(GnodeError::inconsistent(format!(
            "Saving the authentication change failed ({}) and reverting the peers failed ({:?})",
            saved,
            revert.state()
        )))
    }

    pub async fn snapshot(&self) -> Value {
        let time = match self.time.current().await {
            Ok(info) => json!(info),
            Err(e) => {
                warn!("Reading system time failed: {}", e);
                json!({})
            }
        };

        json!({
            "allow_anonymous": self.broker.allow_anonymous().await,
            "time": time,
            "network_settings": self.network.settings().await,
            "api_authentication": self.api_authentication(),
            "gcloud": self.tunnel.read().await,
        })
    }

    /// Apply every recognised key; later keys still run after a failure
    ///
    /// Returns the last error encountered.
    pub async fn apply(&self, update: &Map<String, Value>) -> Result<()> {
        let mut last_err = None;

        if let Some(v) = update.get("allow_anonymous").filter(|v| !v.is_null()) {
            let result = async {
                let allow: bool = parse_key("allow_anonymous", v)?;
                self.broker.set_allow_anonymous(allow).await
            }
            .await;
            if let Err(e) = result {
                last_err = Some(e);
            }
        }

        if let Some(v) = update.get("gnode_time").filter(|v| !v.is_null()) {
            let result = async {
                let time: TimeUpdate = parse_key("gnode_time", v)?;
                self.time.apply(&time).await
            }
            .await;
            if let Err(e) = result {
                last_err = Some(e);
            }
        }

        if let Some(v) = update.get("network_settings").filter(|v| !v.is_null()) {
            let result = async {
                let network: NetworkUpdate = parse_key("network_settings", v)?;
                self.network.apply(&network).await
            }
            .await;
            if let Err(e) = result {
                last_err = Some(e);
            }
        }

        if let Some(v) = update.get("api_authentication").filter(|v| !v.is_null()) {
            let result = async {
                let enabled: bool = parse_key("api_authentication", v)?;
                self.set_api_authentication(enabled).await
            }
            .await;
            if let Err(e) = result {
                last_err = Some(e);
            }
        }

        if let Some(v) = update.get("gcloud").filter(|v| !v.is_null()) {
            let result = async {
                let tunnel: TunnelUpdate = parse_key("gcloud", v)?;
                self.tunnel.write(tunnel).await
            }
            .await;
            if let Err(e) = result {
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => {
                warn!("Settings update finished with error: {}", e);
                Err(e)
            }
            None => Ok(()),
        }
    }
}
