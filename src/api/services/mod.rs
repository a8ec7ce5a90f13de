//! API 服务模块
//!
//! 该模块包含 REST API 的所有端点，包括：
//! - 认证（登录令牌、API 令牌）
//! - 用户、认证包、CA 证书、设备 CRUD
//! - 通道与设置（转发到兄弟服务）
//! - 设备信息与状态

pub mod auth;
pub mod authbundle;
pub mod ca;
pub mod channel;
pub mod device;
pub mod error_code;
mod helpers;
pub mod routes;
pub mod settings;
pub mod system;
mod types;
pub mod users;

// 重新导出类型
pub use types::*;

// 重新导出帮助函数
pub use helpers::{
    MAX_UPLOAD_SIZE, MultipartForm, UploadedFile, api_ok, api_result, auth_context, error_from_gnode,
    error_response, read_multipart, success_response,
};

// 重新导出错误码
pub use error_code::ErrorCode;

pub use ca::CaStore;
pub use routes::api_routes;
