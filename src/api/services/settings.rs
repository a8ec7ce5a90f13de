//! 设备设置端点

use actix_web::{HttpResponse, web};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::services::SettingsService;

use super::helpers::{api_ok, success_response};

pub async fn get_settings(settings: web::Data<Arc<SettingsService>>) -> HttpResponse {
    success_response(settings.snapshot().await)
}

/// 逐项应用请求中的设置，返回最后一个错误
pub async fn put_settings(
    body: web::Json<Map<String, Value>>,
    settings: web::Data<Arc<SettingsService>>,
) -> HttpResponse {
    api_ok(settings.apply(&body).await)
}
