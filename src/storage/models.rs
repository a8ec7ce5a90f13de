use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// 用户（不含密码哈希以外的敏感信息）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// API 令牌状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ApiTokenState {
    Valid = 1,
    Suspended = 3,
    Revoked = 5,
}

impl ApiTokenState {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Valid),
            3 => Some(Self::Suspended),
            5 => Some(Self::Revoked),
            _ => None,
        }
    }
}

/// API 令牌
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiToken {
    pub id: i32,
    pub token: String,
    pub state: ApiTokenState,
    /// Unix 秒
    pub created: i64,
    /// Unix 秒，0 表示永不过期
    pub till: i64,
    pub description: Option<String>,
}

impl ApiToken {
    pub fn expired(&self, now: i64) -> bool {
        self.till != 0 && self.till < now
    }

    /// 可用于认证：状态有效且未过期
    pub fn usable(&self, now: i64) -> bool {
        self.state == ApiTokenState::Valid && !self.expired(now)
    }
}

/// 新建 API 令牌的参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewApiToken {
    #[serde(default)]
    pub till: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// 更新 API 令牌的参数（字段为空则保持不变）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTokenPatch {
    pub state: Option<ApiTokenState>,
    pub till: Option<i64>,
    pub description: Option<String>,
}

/// 下游连接器使用的认证信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthBundle {
    pub authbundle_id: String,
    pub service_type: String,
    pub auth_type: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub keyname: Option<String>,
    #[serde(skip_serializing)]
    pub keydata: Option<Vec<u8>>,
    pub description: Option<String>,
}

/// CA 证书元数据（文件内容保存在 ca_dir 下）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaFile {
    pub id: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// 全局设置行
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub api_authentication: bool,
    pub gcloud: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_authentication: true,
            gcloud: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(state: ApiTokenState, till: i64) -> ApiToken {
        ApiToken {
            id: 1,
            token: "t".into(),
            state,
            created: 0,
            till,
            description: None,
        }
    }

    #[test]
    fn test_token_expiry() {
        assert!(!token(ApiTokenState::Valid, 0).expired(i64::MAX));
        assert!(token(ApiTokenState::Valid, 100).expired(101));
        assert!(!token(ApiTokenState::Valid, 100).expired(100));
    }

    #[test]
    fn test_only_valid_tokens_are_usable() {
        assert!(token(ApiTokenState::Valid, 0).usable(1));
        assert!(!token(ApiTokenState::Suspended, 0).usable(1));
        assert!(!token(ApiTokenState::Revoked, 0).usable(1));
    }

    #[test]
    fn test_state_wire_values() {
        assert_eq!(serde_json::to_string(&ApiTokenState::Revoked).unwrap(), "5");
        assert_eq!(ApiTokenState::from_i32(3), Some(ApiTokenState::Suspended));
        assert_eq!(ApiTokenState::from_i32(2), None);
    }
}
