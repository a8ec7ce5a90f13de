//! 认证包（下游连接器凭据）端点，multipart 表单

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use std::sync::Arc;

use crate::errors::{GnodeError, Result};
use crate::storage::{AuthBundle, SeaOrmStorage};

use super::helpers::{MultipartForm, api_ok, api_result, read_multipart};
use super::types::AuthBundleId;

fn required(form: &MultipartForm, name: &str) -> Result<String> {
    form.text(name)
        .ok_or_else(|| GnodeError::validation(format!("Missing required field: {}", name)))
}

async fn create(payload: Multipart, storage: &SeaOrmStorage) -> Result<AuthBundleId> {
    let mut form = read_multipart(payload).await?;
    let service_type = required(&form, "service_type")?;
    let auth_type = required(&form, "auth_type")?;
    let authbundle_id = form
        .text("authbundle_id")
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let keyfile = form.file("keyfile");
    let bundle = AuthBundle {
        authbundle_id,
        service_type,
        auth_type,
        username: form.text("username"),
        password: form.text("password"),
        keyname: keyfile.as_ref().and_then(|f| f.filename.clone()),
        keydata: keyfile.map(|f| f.data),
        description: form.text("description"),
    };

    let created = storage.create_authbundle(bundle).await?;
    Ok(AuthBundleId {
        authbundle_id: created.authbundle_id,
    })
}

/// 只覆盖请求中出现的字段；描述总是按请求重写
async fn update(id: String, payload: Multipart, storage: &SeaOrmStorage) -> Result<AuthBundleId> {
    let mut form = read_multipart(payload).await?;
    let mut bundle = storage
        .get_authbundle(&id)
        .await?
        .ok_or_else(|| GnodeError::not_found("Authentication bundle not found"))?;

    if let Some(service_type) = form.text("service_type") {
        bundle.service_type = service_type;
    }
    if let Some(auth_type) = form.text("auth_type") {
        bundle.auth_type = auth_type;
    }
    if let Some(username) = form.text("username") {
        bundle.username = Some(username);
    }
    if let Some(password) = form.text("password") {
        bundle.password = Some(password);
    }
    bundle.description = form.text("description");

    // keydata 为 None 时存储层保留原密钥
    bundle.keydata = None;
    if let Some(keyfile) = form.file("keyfile") {
        bundle.keyname = keyfile.filename;
        bundle.keydata = Some(keyfile.data);
    }

    storage.update_authbundle(bundle).await?;
    Ok(AuthBundleId { authbundle_id: id })
}

pub async fn create_authbundle(
    payload: Multipart,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(create(payload, &storage).await)
}

pub async fn list_authbundles(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
    api_result(storage.list_authbundles().await)
}

pub async fn get_authbundle(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(storage.get_authbundle(&path).await.and_then(|b| {
        b.ok_or_else(|| GnodeError::not_found("Authentication bundle not found"))
    }))
}

pub async fn update_authbundle(
    path: web::Path<String>,
    payload: Multipart,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(update(path.into_inner(), payload, &storage).await)
}

pub async fn delete_authbundle(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_ok(storage.delete_authbundle(&path).await)
}
