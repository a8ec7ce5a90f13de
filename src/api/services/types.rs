//! API 类型定义

use serde::{Deserialize, Serialize};

use crate::storage::ApiTokenState;

/// 统一 JSON 响应包装
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// `POST /auth/token` 表单（OAuth2 password flow）
#[derive(Deserialize, Clone, Debug)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// 新建 API 令牌；`duration` 为有效天数，缺省或 0 表示永不过期
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ApiTokenCreateRequest {
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 更新 API 令牌；`duration` 从令牌创建时间起算
#[derive(Deserialize, Clone, Debug)]
pub struct ApiTokenUpdateRequest {
    pub state: ApiTokenState,
    pub duration: i64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiTokenCreated {
    pub apitoken_id: i32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UserCreateRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthBundleId {
    pub authbundle_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CaFileId {
    pub id: String,
}

/// 设备创建/更新请求体，id 来自路径
#[derive(Deserialize, Clone, Debug)]
pub struct DeviceRequest {
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}
