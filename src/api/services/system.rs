//! 设备信息、版本、状态与时区端点

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use crate::gateway::VersionInfo;
use crate::services::{StatusService, TimeService};

use super::helpers::{api_result, success_response};

pub const WELCOME_TEXT: &str = "Welcome to G-Node!";

pub async fn welcome() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(WELCOME_TEXT)
}

pub async fn get_info(version: web::Data<Arc<VersionInfo>>) -> HttpResponse {
    api_result(version.info().await)
}

pub async fn get_version(version: web::Data<Arc<VersionInfo>>) -> HttpResponse {
    api_result(version.report().await)
}

pub async fn get_status(status: web::Data<Arc<StatusService>>) -> HttpResponse {
    api_result(status.report().await)
}

pub async fn get_timezones(time: web::Data<Arc<TimeService>>) -> HttpResponse {
    success_response(time.timezones().await)
}
