use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::jwt::JwtService;
use crate::api::services::CaStore;
use crate::config::{AuthConfig, StaticConfig};
use crate::gateway::{
    BrokerSettings, ChannelRegistry, MirroredToggle, TunnelPortMapping, VersionInfo,
};
use crate::services::{NetworkService, SettingsService, StatusService, TimeService};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::system::command::{CommandRunner, SystemCommandRunner};
use crate::system::ipc::RequestReplyClient;
use crate::system::supervisor::ServiceSupervisor;
use crate::utils::password::hash_config_password;

#[derive(Clone)]
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub jwt: Arc<JwtService>,
    pub settings: Arc<SettingsService>,
    pub registry: Arc<ChannelRegistry>,
    pub version: Arc<VersionInfo>,
    pub status: Arc<StatusService>,
    pub time: Arc<TimeService>,
    pub ca_store: Arc<CaStore>,
}

impl StartupContext {
    /// 基于已有的存储、IPC 客户端和命令执行器组装全部服务
    ///
    /// 测试可以传入脚本化的 transport 和 runner。
    pub async fn assemble(
        config: &StaticConfig,
        storage: Arc<SeaOrmStorage>,
        client: Arc<RequestReplyClient>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let mode = config.system.device_mode();
        info!("Device mode: {}", mode.as_ref());

        let supervisor = Arc::new(ServiceSupervisor::new(runner.clone(), mode));

        let toggle = Arc::new(MirroredToggle::new(client.clone()));
        let tunnel = Arc::new(TunnelPortMapping::new(client.clone()));
        let broker = Arc::new(BrokerSettings::new(client.clone()));
        let registry = Arc::new(ChannelRegistry::new(client.clone(), supervisor.clone()));
        let version = Arc::new(VersionInfo::new(client, &config.system));

        let time = Arc::new(TimeService::new(runner, mode));
        let network = Arc::new(NetworkService::new(
            supervisor.clone(),
            config.system.ap_unit.clone(),
        ));
        let status = Arc::new(StatusService::new(
            supervisor,
            network.clone(),
            &config.system,
        ));

        let settings = SettingsService::init(
            storage.clone(),
            toggle,
            tunnel,
            broker,
            time.clone(),
            network,
        )
        .await
        .context("Failed to initialize device settings")?;

        let jwt = JwtService::from_config(&config.auth).context("Failed to load signing keys")?;
        debug!("Access tokens signed with {:?}", jwt.algorithm());

        Ok(Self {
            storage,
            jwt: Arc::new(jwt),
            settings: Arc::new(settings),
            registry,
            version,
            status,
            time,
            ca_store: Arc::new(CaStore::new(&config.system.ca_dir)),
        })
    }
}

/// 数据库中没有任何用户时创建默认管理员
///
/// 返回是否创建了用户。
pub async fn ensure_default_user(storage: &SeaOrmStorage, auth: &AuthConfig) -> Result<bool> {
    if storage.count_users().await? > 0 {
        return Ok(false);
    }

    let hashed = hash_config_password(&auth.default_password)
        .context("Failed to hash default password")?;
    storage
        .create_user(&auth.default_username, &hashed, true)
        .await
        .context("Failed to create default user")?;

    if auth.default_password == "admin" {
        warn!(
            "Created default user '{}' with the built-in password, change it as soon as possible",
            auth.default_username
        );
    } else {
        info!("Created default user '{}'", auth.default_username);
    }
    Ok(true)
}

/// 准备服务器启动的上下文
/// 包括存储、默认用户、IPC 客户端和各个服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    let config = crate::config::get_config();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    ensure_default_user(&storage, &config.auth).await?;

    let client = Arc::new(RequestReplyClient::from_config(&config.peers));
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);

    let context = StartupContext::assemble(&config, storage, client, runner).await?;

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}
