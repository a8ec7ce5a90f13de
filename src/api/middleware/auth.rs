use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{CONTENT_TYPE, WWW_AUTHENTICATE},
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::api::jwt::JwtService;
use crate::api::services::{ApiResponse, ErrorCode};
use crate::services::SettingsService;
use crate::storage::SeaOrmStorage;

/// 通过认证的调用方，由中间件写入请求扩展
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthContext {
    /// 认证已关闭，所有请求放行
    Disabled,
    /// Web UI 用户（JWT `sub`）
    User(String),
    /// API 令牌 id
    ApiToken(i32),
}

/// API authentication middleware
#[derive(Clone)]
pub struct ApiAuth {
    api_prefix: Rc<str>,
}

impl ApiAuth {
    pub fn new(api_prefix: &str) -> Self {
        Self {
            api_prefix: Rc::from(api_prefix.trim_end_matches('/')),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiAuthMiddleware {
            service: Rc::new(service),
            api_prefix: self.api_prefix.clone(),
        }))
    }
}

pub struct ApiAuthMiddleware<S> {
    service: Rc<S>,
    api_prefix: Rc<str>,
}

impl<S, B> ApiAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    /// Handle unauthorized requests
    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        info!("API authentication failed - invalid or missing token");
        req.into_response(
            HttpResponse::Unauthorized()
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .insert_header((WWW_AUTHENTICATE, "Bearer"))
                .json(ApiResponse::<()> {
                    code: ErrorCode::TokenInvalid as i32,
                    message: "Token is not valid".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    fn handle_misconfigured(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        warn!("Authentication middleware mounted without settings/storage/jwt app data");
        req.into_response(
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()> {
                    code: ErrorCode::InternalServerError as i32,
                    message: "Authentication is not configured".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// 欢迎页和登录端点无需认证
    fn is_public_endpoint(req: &ServiceRequest, api_prefix: &str) -> bool {
        let path = req.path().trim_end_matches('/');
        path == api_prefix || path == format!("{}/auth/token", api_prefix)
    }

    /// 依次尝试 JWT 与 API 令牌
    async fn authenticate(
        token: &str,
        jwt: &JwtService,
        storage: &SeaOrmStorage,
    ) -> Option<AuthContext> {
        match jwt.validate_access_token(token) {
            Ok(claims) => {
                trace!("Bearer token validated as JWT for {}", claims.sub);
                return Some(AuthContext::User(claims.sub));
            }
            Err(e) => debug!("Bearer token is not a valid JWT: {}", e),
        }

        match storage.find_api_token(token).await {
            Ok(Some(api_token)) if api_token.usable(chrono::Utc::now().timestamp()) => {
                trace!("Bearer token validated as API token {}", api_token.id);
                Some(AuthContext::ApiToken(api_token.id))
            }
            Ok(Some(api_token)) => {
                info!("API token {} is suspended, revoked or expired", api_token.id);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("API token lookup failed: {}", e);
                None
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for ApiAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let api_prefix = self.api_prefix.clone();

        Box::pin(async move {
            if Self::is_public_endpoint(&req, &api_prefix) {
                trace!("Public endpoint accessed - bypassing authentication");
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            let (Some(settings), Some(storage), Some(jwt)) = (
                req.app_data::<web::Data<Arc<SettingsService>>>().cloned(),
                req.app_data::<web::Data<Arc<SeaOrmStorage>>>().cloned(),
                req.app_data::<web::Data<Arc<JwtService>>>().cloned(),
            ) else {
                return Ok(Self::handle_misconfigured(req));
            };

            // 每次请求都读取最新的开关状态
            if !settings.api_authentication() {
                req.extensions_mut().insert(AuthContext::Disabled);
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            let Some(token) = Self::extract_bearer_token(&req) else {
                return Ok(Self::handle_unauthorized(req));
            };

            match Self::authenticate(&token, &jwt, &storage).await {
                Some(context) => {
                    req.extensions_mut().insert(context);
                    Ok(srv.call(req).await?.map_into_left_body())
                }
                None => Ok(Self::handle_unauthorized(req)),
            }
        })
    }
}
