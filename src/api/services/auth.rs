//! 认证相关端点：登录令牌与 API 令牌管理

use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor};
use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::{HttpResponse, web};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::jwt::JwtService;
use crate::config::AuthConfig;
use crate::errors::GnodeError;
use crate::services::SettingsService;
use crate::storage::{ApiTokenPatch, NewApiToken, SeaOrmStorage};
use crate::utils::password::check_login;

use super::error_code::ErrorCode;
use super::helpers::{api_ok, api_result, error_from_gnode, success_response};
use super::types::{
    ApiResponse, ApiTokenCreateRequest, ApiTokenCreated, ApiTokenUpdateRequest, TokenForm,
    TokenResponse,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// 创建登录限流器
///
/// 按连接 IP 限流，超限返回 HTTP 429 Too Many Requests
pub fn login_rate_limiter(auth: &AuthConfig) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let seconds = auth.login_seconds_per_request.max(1);
    let burst = auth.login_burst.max(1);

    let config = GovernorConfigBuilder::default()
        .seconds_per_request(seconds)
        .burst_size(burst)
        .finish()
        .unwrap_or_else(|| {
            warn!("Invalid login rate limit config, using defaults");
            GovernorConfig::default()
        });

    debug!(
        "Login rate limiter created: 1 req/{}s, burst {}",
        seconds, burst
    );
    Governor::new(&config)
}

/// `GET /auth/token`：认证关闭时返回 204，否则只接受 POST
pub async fn token_status(settings: web::Data<Arc<SettingsService>>) -> HttpResponse {
    if settings.api_authentication() {
        HttpResponse::MethodNotAllowed().finish()
    } else {
        HttpResponse::NoContent().finish()
    }
}

/// `POST /auth/token`：用户名密码换取访问令牌
pub async fn issue_token(
    form: web::Form<TokenForm>,
    settings: web::Data<Arc<SettingsService>>,
    storage: web::Data<Arc<SeaOrmStorage>>,
    jwt: web::Data<Arc<JwtService>>,
) -> HttpResponse {
    if !settings.api_authentication() {
        return HttpResponse::NoContent().finish();
    }

    let user = match storage.find_user_by_username(&form.username).await {
        Ok(user) => user,
        Err(e) => return error_from_gnode(&e),
    };

    let stored = user.as_ref().map(|u| u.hashed_password.as_str());
    let verified = check_login(&form.password, stored).unwrap_or_else(|e| {
        warn!("Password verification error for {}: {}", form.username, e);
        false
    }) && user.as_ref().is_some_and(|u| u.is_active);

    let Some(user) = user.filter(|_| verified) else {
        info!("Login failed for user {}", form.username);
        return HttpResponse::Unauthorized()
            .insert_header((WWW_AUTHENTICATE, "Bearer"))
            .json(ApiResponse::<()> {
                code: ErrorCode::AuthFailed as i32,
                message: "Incorrect username or password".to_string(),
                data: None,
            });
    };

    match jwt.generate_access_token(&user.username) {
        Ok(access_token) => {
            info!("User {} logged in", user.username);
            success_response(TokenResponse {
                access_token,
                token_type: "bearer".to_string(),
            })
        }
        Err(e) => error_from_gnode(&GnodeError::internal(format!(
            "Failed to generate token: {}",
            e
        ))),
    }
}

pub async fn create_api_token(
    body: web::Json<ApiTokenCreateRequest>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let request = body.into_inner();
    let till = match request.duration {
        Some(days) if days < 0 => {
            return error_from_gnode(&GnodeError::validation("duration must not be negative"));
        }
        Some(days) if days > 0 => chrono::Utc::now().timestamp() + days * SECONDS_PER_DAY,
        _ => 0,
    };
    let params = NewApiToken {
        till,
        description: request.description,
    };

    // 令牌碰撞时重试一次
    let result = match storage.create_api_token(params.clone()).await {
        Err(GnodeError::Conflict(_)) => storage.create_api_token(params).await,
        other => other,
    };

    api_result(result.map(|token| ApiTokenCreated {
        apitoken_id: token.id,
    }))
}

pub async fn list_api_tokens(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
    api_result(storage.list_api_tokens().await)
}

pub async fn get_api_token(
    path: web::Path<i32>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let id = path.into_inner();
    api_result(
        storage
            .get_api_token(id)
            .await
            .and_then(|t| t.ok_or_else(|| GnodeError::not_found("Apitoken not found"))),
    )
}

/// 更新状态、有效期（从创建时间起算的天数，0 为永久）和描述
pub async fn update_api_token(
    path: web::Path<i32>,
    body: web::Json<ApiTokenUpdateRequest>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let id = path.into_inner();
    let request = body.into_inner();

    if request.duration < 0 {
        return error_from_gnode(&GnodeError::validation("duration must not be negative"));
    }

    let existing = match storage.get_api_token(id).await {
        Ok(Some(token)) => token,
        Ok(None) => return error_from_gnode(&GnodeError::not_found("Apitoken not found")),
        Err(e) => return error_from_gnode(&e),
    };

    let till = if request.duration == 0 {
        0
    } else {
        existing.created + request.duration * SECONDS_PER_DAY
    };
    let patch = ApiTokenPatch {
        state: Some(request.state),
        till: Some(till),
        description: request.description.filter(|d| !d.is_empty()),
    };

    api_result(storage.update_api_token(id, patch).await)
}

pub async fn delete_api_token(
    path: web::Path<i32>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_ok(storage.delete_api_token(path.into_inner()).await)
}
