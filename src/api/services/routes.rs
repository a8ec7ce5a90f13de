//! API 路由配置
//!
//! 所有路由挂载在 `server.api_prefix` 下，由 [`ApiAuth`](crate::api::middleware::ApiAuth) 包裹。

use actix_web::web;

use crate::config::AuthConfig;

use super::auth::{
    create_api_token, delete_api_token, get_api_token, issue_token, list_api_tokens,
    login_rate_limiter, token_status, update_api_token,
};
use super::authbundle::{
    create_authbundle, delete_authbundle, get_authbundle, list_authbundles, update_authbundle,
};
use super::ca::{create_ca, delete_ca, get_ca, list_ca, update_ca};
use super::channel::{create_channel, delete_channel, get_channel, list_channels, update_channel};
use super::device::{create_device, delete_device, get_device, list_devices, update_device};
use super::settings::{get_settings, put_settings};
use super::system::{get_info, get_status, get_timezones, get_version, welcome};
use super::users::{create_user, delete_user, get_me, get_user, list_users};

/// 认证路由 `/auth`
///
/// - GET/POST /auth/token - 登录（POST 带限流）
/// - /auth/apitoken - API 令牌 CRUD
pub fn auth_routes(auth: &AuthConfig) -> actix_web::Scope {
    web::scope("/auth")
        .route("/token", web::get().to(token_status))
        .route(
            "/token",
            web::post().to(issue_token).wrap(login_rate_limiter(auth)),
        )
        .route("/apitoken", web::get().to(list_api_tokens))
        .route("/apitoken/", web::get().to(list_api_tokens))
        .route("/apitoken", web::post().to(create_api_token))
        .route("/apitoken/{id}", web::get().to(get_api_token))
        .route("/apitoken/{id}", web::put().to(update_api_token))
        .route("/apitoken/{id}", web::delete().to(delete_api_token))
}

/// 用户路由 `/user`（`/me` 必须在 `/{id}` 之前）
pub fn user_routes() -> actix_web::Scope {
    web::scope("/user")
        .route("", web::get().to(list_users))
        .route("/", web::get().to(list_users))
        .route("", web::post().to(create_user))
        .route("/", web::post().to(create_user))
        .route("/me", web::get().to(get_me))
        .route("/{id}", web::get().to(get_user))
        .route("/{id}", web::delete().to(delete_user))
}

pub fn authbundle_routes() -> actix_web::Scope {
    web::scope("/authbundle")
        .route("", web::get().to(list_authbundles))
        .route("/", web::get().to(list_authbundles))
        .route("", web::post().to(create_authbundle))
        .route("/", web::post().to(create_authbundle))
        .route("/{id}", web::get().to(get_authbundle))
        .route("/{id}", web::put().to(update_authbundle))
        .route("/{id}", web::delete().to(delete_authbundle))
}

pub fn ca_routes() -> actix_web::Scope {
    web::scope("/ca")
        .route("", web::get().to(list_ca))
        .route("/", web::get().to(list_ca))
        .route("", web::post().to(create_ca))
        .route("/", web::post().to(create_ca))
        .route("/{id}", web::get().to(get_ca))
        .route("/{id}", web::put().to(update_ca))
        .route("/{id}", web::delete().to(delete_ca))
}

pub fn device_routes() -> actix_web::Scope {
    web::scope("/device")
        .route("", web::get().to(list_devices))
        .route("/", web::get().to(list_devices))
        .route("/{id}", web::get().to(get_device))
        .route("/{id}", web::post().to(create_device))
        .route("/{id}", web::put().to(update_device))
        .route("/{id}", web::delete().to(delete_device))
}

pub fn channel_routes() -> actix_web::Scope {
    web::scope("/channel")
        .route("", web::get().to(list_channels))
        .route("/", web::get().to(list_channels))
        .route("/{id}", web::get().to(get_channel))
        .route("/{id}", web::post().to(create_channel))
        .route("/{id}", web::put().to(update_channel))
        .route("/{id}", web::delete().to(delete_channel))
}

pub fn settings_routes() -> actix_web::Scope {
    web::scope("/settings")
        .route("", web::get().to(get_settings))
        .route("/", web::get().to(get_settings))
        .route("", web::put().to(put_settings))
        .route("/", web::put().to(put_settings))
}

/// 组合所有子模块路由
pub fn api_routes(cfg: &mut web::ServiceConfig, auth: &AuthConfig) {
    cfg.route("", web::get().to(welcome))
        .route("/", web::get().to(welcome))
        .route("/info", web::get().to(get_info))
        .route("/version", web::get().to(get_version))
        .route("/status", web::get().to(get_status))
        .route("/timezones", web::get().to(get_timezones))
        .service(auth_routes(auth))
        .service(user_routes())
        .service(authbundle_routes())
        .service(ca_routes())
        .service(device_routes())
        .service(channel_routes())
        .service(settings_routes());
}
