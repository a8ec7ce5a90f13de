use std::fmt;

use actix_web::http::StatusCode;

use crate::system::command::CommandError;
use crate::system::ipc::{IpcError, RejectionKind};
use crate::utils::password::PasswordError;

#[derive(Debug, Clone)]
pub enum GnodeError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    FeatureDisabled(String),
    Serialization(String),
    PeerUnavailable(String),
    PeerRejected(String),
    RolledBack(String),
    Inconsistent(String),
    CommandFailed(String),
    Internal(String),
}

impl GnodeError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GnodeError::DatabaseConfig(_) => "E001",
            GnodeError::DatabaseConnection(_) => "E002",
            GnodeError::DatabaseOperation(_) => "E003",
            GnodeError::FileOperation(_) => "E004",
            GnodeError::Validation(_) => "E005",
            GnodeError::NotFound(_) => "E006",
            GnodeError::Conflict(_) => "E007",
            GnodeError::Unauthorized(_) => "E008",
            GnodeError::Forbidden(_) => "E009",
            GnodeError::FeatureDisabled(_) => "E010",
            GnodeError::Serialization(_) => "E011",
            GnodeError::PeerUnavailable(_) => "E012",
            GnodeError::PeerRejected(_) => "E013",
            GnodeError::RolledBack(_) => "E014",
            GnodeError::Inconsistent(_) => "E015",
            GnodeError::CommandFailed(_) => "E016",
            GnodeError::Internal(_) => "E017",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GnodeError::DatabaseConfig(_) => "Database Configuration Error",
            GnodeError::DatabaseConnection(_) => "Database Connection Error",
            GnodeError::DatabaseOperation(_) => "Database Operation Error",
            GnodeError::FileOperation(_) => "File Operation Error",
            GnodeError::Validation(_) => "Validation Error",
            GnodeError::NotFound(_) => "Resource Not Found",
            GnodeError::Conflict(_) => "Resource Conflict",
            GnodeError::Unauthorized(_) => "Unauthorized",
            GnodeError::Forbidden(_) => "Forbidden",
            GnodeError::FeatureDisabled(_) => "Feature Disabled",
            GnodeError::Serialization(_) => "Serialization Error",
            GnodeError::PeerUnavailable(_) => "Peer Service Unavailable",
            GnodeError::PeerRejected(_) => "Peer Service Rejected Request",
            GnodeError::RolledBack(_) => "Change Rolled Back",
            GnodeError::Inconsistent(_) => "Peer Services Inconsistent",
            GnodeError::CommandFailed(_) => "System Command Failed",
            GnodeError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GnodeError::DatabaseConfig(msg)
            | GnodeError::DatabaseConnection(msg)
            | GnodeError::DatabaseOperation(msg)
            | GnodeError::FileOperation(msg)
            | GnodeError::Validation(msg)
            | GnodeError::NotFound(msg)
            | GnodeError::Conflict(msg)
            | GnodeError::Unauthorized(msg)
            | GnodeError::Forbidden(msg)
            | GnodeError::FeatureDisabled(msg)
            | GnodeError::Serialization(msg)
            | GnodeError::PeerUnavailable(msg)
            | GnodeError::PeerRejected(msg)
            | GnodeError::RolledBack(msg)
            | GnodeError::Inconsistent(msg)
            | GnodeError::CommandFailed(msg)
            | GnodeError::Internal(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            GnodeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GnodeError::NotFound(_) => StatusCode::NOT_FOUND,
            GnodeError::Conflict(_) => StatusCode::CONFLICT,
            GnodeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GnodeError::Forbidden(_) => StatusCode::FORBIDDEN,
            GnodeError::FeatureDisabled(_) => StatusCode::MOVED_PERMANENTLY,
            GnodeError::PeerRejected(_) => StatusCode::BAD_REQUEST,
            GnodeError::PeerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GnodeError::DatabaseConfig(_)
            | GnodeError::DatabaseConnection(_)
            | GnodeError::DatabaseOperation(_)
            | GnodeError::FileOperation(_)
            | GnodeError::Serialization(_)
            | GnodeError::RolledBack(_)
            | GnodeError::Inconsistent(_)
            | GnodeError::CommandFailed(_)
            | GnodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GnodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GnodeError {}

// 便捷的构造函数
impl GnodeError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        GnodeError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        GnodeError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        GnodeError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        GnodeError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GnodeError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GnodeError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        GnodeError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        GnodeError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        GnodeError::Forbidden(msg.into())
    }

    pub fn feature_disabled<T: Into<String>>(msg: T) -> Self {
        GnodeError::FeatureDisabled(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GnodeError::Serialization(msg.into())
    }

    pub fn peer_unavailable<T: Into<String>>(msg: T) -> Self {
        GnodeError::PeerUnavailable(msg.into())
    }

    pub fn peer_rejected<T: Into<String>>(msg: T) -> Self {
        GnodeError::PeerRejected(msg.into())
    }

    pub fn rolled_back<T: Into<String>>(msg: T) -> Self {
        GnodeError::RolledBack(msg.into())
    }

    pub fn inconsistent<T: Into<String>>(msg: T) -> Self {
        GnodeError::Inconsistent(msg.into())
    }

    pub fn command_failed<T: Into<String>>(msg: T) -> Self {
        GnodeError::CommandFailed(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        GnodeError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for GnodeError {
    fn from(err: sea_orm::DbErr) -> Self {
        GnodeError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for GnodeError {
    fn from(err: std::io::Error) -> Self {
        GnodeError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for GnodeError {
    fn from(err: serde_json::Error) -> Self {
        GnodeError::Serialization(err.to_string())
    }
}

impl From<PasswordError> for GnodeError {
    fn from(err: PasswordError) -> Self {
        GnodeError::Internal(err.to_string())
    }
}

impl From<CommandError> for GnodeError {
    fn from(err: CommandError) -> Self {
        GnodeError::CommandFailed(err.to_string())
    }
}

/// IPC 错误映射：对端业务错误映射为 4xx，传输/解码错误统一为 503
impl From<IpcError> for GnodeError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::Rejected(rejection) => match rejection.kind {
                RejectionKind::NotFound => GnodeError::NotFound(rejection.message),
                RejectionKind::Conflict => GnodeError::Conflict(rejection.message),
                RejectionKind::Refused => GnodeError::PeerRejected(rejection.message),
            },
            other => GnodeError::PeerUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GnodeError>;
