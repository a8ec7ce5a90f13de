//! 用户管理端点
//!
//! 只在 API 认证开启时可用，否则返回 301。

use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::AuthContext;
use crate::errors::{GnodeError, Result};
use crate::services::SettingsService;
use crate::storage::{SeaOrmStorage, User};
use crate::utils::password::hash_password;

use super::helpers::{api_result, auth_context, error_from_gnode};
use super::types::UserCreateRequest;

/// 解析当前登录用户
async fn current_user(
    req: &HttpRequest,
    settings: &SettingsService,
    storage: &SeaOrmStorage,
) -> Result<User> {
    if !settings.api_authentication() {
        return Err(GnodeError::feature_disabled(
            "Authentication is disabled; this endpoint is not available.",
        ));
    }

    let Some(AuthContext::User(username)) = auth_context(req) else {
        return Err(GnodeError::unauthorized("Could not validate credentials"));
    };

    let user = storage
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| GnodeError::unauthorized("Could not validate credentials"))?;

    if !user.is_active {
        return Err(GnodeError::forbidden("Inactive user"));
    }
    Ok(user)
}

pub async fn list_users(
    req: HttpRequest,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    if let Err(e) = current_user(&req, &settings, &storage).await {
        return error_from_gnode(&e);
    }
    api_result(storage.list_users().await)
}

pub async fn get_me(
    req: HttpRequest,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(current_user(&req, &settings, &storage).await)
}

pub async fn get_user(
    req: HttpRequest,
    path: web::Path<i32>,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    if let Err(e) = current_user(&req, &settings, &storage).await {
        return error_from_gnode(&e);
    }
    api_result(
        storage
            .get_user(path.into_inner())
            .await
            .and_then(|u| u.ok_or_else(|| GnodeError::not_found("User not found"))),
    )
}

/// 仅管理员可创建用户
pub async fn create_user(
    req: HttpRequest,
    body: web::Json<UserCreateRequest>,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let result = async {
        let current = current_user(&req, &settings, &storage).await?;
        if !current.is_admin {
            return Err(GnodeError::forbidden(
                "Only admin users are authorized to create new users",
            ));
        }

        let request = body.into_inner();
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(GnodeError::validation("Username and password are required"));
        }

        let hashed = hash_password(&request.password)?;
        let user = storage
            .create_user(request.username.trim(), &hashed, request.is_admin)
            .await?;
        info!("User {} created by {}", user.username, current.username);
        Ok::<User, GnodeError>(user)
    }
    .await;

    api_result(result)
}

/// 用户可删除自己，管理员可删除任何人；默认用户不可删除
pub async fn delete_user(
    req: HttpRequest,
    path: web::Path<i32>,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let user_id = path.into_inner();

    let result = async {
        let current = current_user(&req, &settings, &storage).await?;
        if current.id != user_id && !current.is_admin {
            return Err(GnodeError::forbidden("Unauthorized action"));
        }
        if storage.first_user_id().await? == Some(user_id) {
            return Err(GnodeError::forbidden("Cannot delete first user"));
        }

        let user = storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| GnodeError::not_found("User not found"))?;
        storage.delete_user(user_id).await?;
        info!("User {} deleted by {}", user.username, current.username);
        Ok::<User, GnodeError>(user)
    }
    .await;

    api_result(result)
}
