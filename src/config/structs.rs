use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、CPU 数量、API 前缀
/// - database: 数据库连接配置
/// - logging: 日志配置
/// - auth: JWT 密钥与默认用户
/// - peers: 兄弟服务（broker / bridge / tunnel）的 IPC 地址与超时
/// - system: 设备模式、systemd 单元名与文件路径
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub peers: PeersConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：GNODE，分隔符：__
    /// 示例：GNODE__SERVER__PORT=8000
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("GNODE")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 认证配置
///
/// 同时配置了 `private_key_path` 与 `public_key_path` 时使用 ES256，
/// 否则退回到 HS256 + `jwt_secret`（为空时启动时随机生成）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub public_key_path: Option<String>,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_username")]
    pub default_username: String,
    #[serde(default = "default_password")]
    pub default_password: String,
    /// 登录限流：每个令牌的补充间隔（秒）
    #[serde(default = "default_login_seconds_per_request")]
    pub login_seconds_per_request: u64,
    #[serde(default = "default_login_burst")]
    pub login_burst: u32,
}

/// 单个兄弟服务的 IPC 端点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub address: String,
    pub timeout_ms: u64,
}

/// 兄弟服务端点表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersConfig {
    #[serde(default = "default_broker_peer")]
    pub broker: PeerConfig,
    #[serde(default = "default_bridge_peer")]
    pub bridge: PeerConfig,
    #[serde(default = "default_tunnel_peer")]
    pub tunnel: PeerConfig,
}

/// 设备运行模式
///
/// 物理设备通过 systemd 管理服务，容器（虚拟）模式通过 supervisord。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceMode {
    Physical,
    Virtual,
}

/// 系统集成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// 不配置时根据 /.dockerenv 自动检测
    #[serde(default)]
    pub mode: Option<DeviceMode>,
    #[serde(default = "default_broker_unit")]
    pub broker_unit: String,
    #[serde(default = "default_bridge_unit")]
    pub bridge_unit: String,
    #[serde(default = "default_tunnel_unit")]
    pub tunnel_unit: String,
    #[serde(default = "default_ap_unit")]
    pub ap_unit: String,
    #[serde(default = "default_serial_number_path")]
    pub serial_number_path: String,
    #[serde(default = "default_api_version_path")]
    pub api_version_path: String,
    #[serde(default = "default_ca_dir")]
    pub ca_dir: String,
}

impl SystemConfig {
    /// 当前设备模式（配置优先，其次自动检测）
    pub fn device_mode(&self) -> DeviceMode {
        self.mode.unwrap_or_else(|| {
            if std::path::Path::new("/.dockerenv").exists() {
                DeviceMode::Virtual
            } else {
                DeviceMode::Physical
            }
        })
    }
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_database_url() -> String {
    "sqlite://gnode.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    5
}

fn default_database_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_access_token_minutes() -> u64 {
    1440
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_login_seconds_per_request() -> u64 {
    1
}

fn default_login_burst() -> u32 {
    5
}

fn default_broker_peer() -> PeerConfig {
    PeerConfig {
        address: "ipc:///tmp/mqbc-zmq.sock".to_string(),
        timeout_ms: 500,
    }
}

fn default_bridge_peer() -> PeerConfig {
    PeerConfig {
        address: "ipc:///tmp/m2eb-zmq.sock".to_string(),
        timeout_ms: 500,
    }
}

fn default_tunnel_peer() -> PeerConfig {
    PeerConfig {
        address: "ipc:///run/gnode/gclient.sock".to_string(),
        timeout_ms: 4000,
    }
}

fn default_broker_unit() -> String {
    "mqbc.service".to_string()
}

fn default_bridge_unit() -> String {
    "m2eb.service".to_string()
}

fn default_tunnel_unit() -> String {
    "gnode-cloud-client.service".to_string()
}

fn default_ap_unit() -> String {
    "hostapd@SoftAp0".to_string()
}

fn default_serial_number_path() -> String {
    "/run/gnode/serial_number".to_string()
}

fn default_api_version_path() -> String {
    "./api_version.txt".to_string()
}

fn default_ca_dir() -> String {
    "/gnode/storage/ca".to_string()
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key_path: None,
            public_key_path: None,
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            default_username: default_username(),
            default_password: default_password(),
            login_seconds_per_request: default_login_seconds_per_request(),
            login_burst: default_login_burst(),
        }
    }
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            broker: default_broker_peer(),
            bridge: default_bridge_peer(),
            tunnel: default_tunnel_peer(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            mode: None,
            broker_unit: default_broker_unit(),
            bridge_unit: default_bridge_unit(),
            tunnel_unit: default_tunnel_unit(),
            ap_unit: default_ap_unit(),
            serial_number_path: default_serial_number_path(),
            api_version_path: default_api_version_path(),
            ca_dir: default_ca_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_peer_timeouts() {
        let config = StaticConfig::default();
        assert_eq!(config.peers.broker.timeout_ms, 500);
        assert_eq!(config.peers.bridge.timeout_ms, 500);
        assert_eq!(config.peers.tunnel.timeout_ms, 4000);
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.api_prefix, "/api");
        assert_eq!(parsed.system.broker_unit, "mqbc.service");
        assert_eq!(parsed.auth.access_token_minutes, 1440);
    }

    #[test]
    fn test_explicit_mode_wins_over_detection() {
        let system = SystemConfig {
            mode: Some(DeviceMode::Virtual),
            ..SystemConfig::default()
        };
        assert_eq!(system.device_mode(), DeviceMode::Virtual);
    }
}
