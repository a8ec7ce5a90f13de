//! 通道端点，转发到 [`ChannelRegistry`]

use actix_web::{HttpResponse, web};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use crate::errors::GnodeError;
use crate::gateway::ChannelRegistry;

use super::helpers::{api_ok, api_result, success_response};

pub async fn list_channels(registry: web::Data<Arc<ChannelRegistry>>) -> HttpResponse {
    let channels = registry.list().await;
    trace!("Channel list returned {} entries", channels.len());
    success_response(channels)
}

pub async fn get_channel(
    path: web::Path<String>,
    registry: web::Data<Arc<ChannelRegistry>>,
) -> HttpResponse {
    api_result(
        registry
            .get(&path)
            .await
            .and_then(|c| c.ok_or_else(|| GnodeError::not_found("Channel not found"))),
    )
}

pub async fn create_channel(
    path: web::Path<String>,
    body: web::Json<Value>,
    registry: web::Data<Arc<ChannelRegistry>>,
) -> HttpResponse {
    api_ok(registry.create(&path, body.into_inner()).await)
}

pub async fn update_channel(
    path: web::Path<String>,
    body: web::Json<Value>,
    registry: web::Data<Arc<ChannelRegistry>>,
) -> HttpResponse {
    api_ok(registry.update(&path, body.into_inner()).await)
}

pub async fn delete_channel(
    path: web::Path<String>,
    registry: web::Data<Arc<ChannelRegistry>>,
) -> HttpResponse {
    api_ok(registry.delete(&path).await)
}
