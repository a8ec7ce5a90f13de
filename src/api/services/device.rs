//! 设备端点

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use crate::errors::GnodeError;
use crate::storage::{Device, SeaOrmStorage};

use super::helpers::{api_ok, api_result};
use super::types::DeviceRequest;

fn to_device(id: String, request: DeviceRequest) -> Device {
    Device {
        id,
        device_type: request.device_type,
        enabled: request.enabled,
        description: request.description,
    }
}

pub async fn create_device(
    path: web::Path<String>,
    body: web::Json<DeviceRequest>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let device = to_device(path.into_inner(), body.into_inner());
    api_result(storage.create_device(device).await)
}

pub async fn list_devices(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
    api_result(storage.list_devices().await)
}

pub async fn get_device(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(
        storage
            .get_device(&path)
            .await
            .and_then(|d| d.ok_or_else(|| GnodeError::not_found("Device not found"))),
    )
}

pub async fn update_device(
    path: web::Path<String>,
    body: web::Json<DeviceRequest>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    let device = to_device(path.into_inner(), body.into_inner());
    api_result(storage.update_device(device).await)
}

pub async fn delete_device(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_ok(storage.delete_device(&path).await)
}
