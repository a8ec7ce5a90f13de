//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::GnodeError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 兄弟服务错误
/// - 4000-4099: 系统命令错误
/// - 5000-5099: 存储错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    ValidationFailed = 1006,
    Conflict = 1009,
    FeatureDisabled = 1020,
    InvalidMultipartData = 1040,
    FileReadError = 1041,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,

    // 兄弟服务错误 3000-3099
    PeerUnavailable = 3000,
    PeerRejected = 3001,
    ChangeRolledBack = 3002,
    PeersInconsistent = 3003,

    // 系统命令错误 4000-4099
    CommandFailed = 4000,

    // 存储错误 5000-5099
    DatabaseError = 5000,
    FileOperationFailed = 5001,
}

impl From<&GnodeError> for ErrorCode {
    fn from(err: &GnodeError) -> Self {
        match err {
            GnodeError::Validation(_) => ErrorCode::ValidationFailed,
            GnodeError::NotFound(_) => ErrorCode::NotFound,
            GnodeError::Conflict(_) => ErrorCode::Conflict,
            GnodeError::Unauthorized(_) => ErrorCode::Unauthorized,
            GnodeError::Forbidden(_) => ErrorCode::Forbidden,
            GnodeError::FeatureDisabled(_) => ErrorCode::FeatureDisabled,
            GnodeError::PeerUnavailable(_) => ErrorCode::PeerUnavailable,
            GnodeError::PeerRejected(_) => ErrorCode::PeerRejected,
            GnodeError::RolledBack(_) => ErrorCode::ChangeRolledBack,
            GnodeError::Inconsistent(_) => ErrorCode::PeersInconsistent,
            GnodeError::CommandFailed(_) => ErrorCode::CommandFailed,
            GnodeError::DatabaseConfig(_)
            | GnodeError::DatabaseConnection(_)
            | GnodeError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            GnodeError::FileOperation(_) => ErrorCode::FileOperationFailed,
            GnodeError::Serialization(_) | GnodeError::Internal(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&ErrorCode::PeersInconsistent).unwrap(),
            "3003"
        );
    }

    #[test]
    fn test_partial_mutations_have_own_codes() {
        let rolled = ErrorCode::from(&GnodeError::rolled_back("x"));
        let broken = ErrorCode::from(&GnodeError::inconsistent("x"));
        assert_eq!(rolled, ErrorCode::ChangeRolledBack);
        assert_eq!(broken, ErrorCode::PeersInconsistent);
    }
}
