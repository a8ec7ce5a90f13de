//! API 帮助函数

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

use crate::api::middleware::AuthContext;
use crate::errors::GnodeError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 单个上传文件的大小上限
pub const MAX_UPLOAD_SIZE: usize = 1024 * 1024;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 无数据的成功响应
pub fn ok_response() -> HttpResponse {
    json_response::<()>(StatusCode::OK, ErrorCode::Success, "OK", None)
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 GnodeError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_gnode(err: &GnodeError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    error_response(status, ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 GnodeError。
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<GnodeError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_gnode(&e.into()),
    }
}

/// 无数据版本的 [`api_result`]
pub fn api_ok<E: Into<GnodeError>>(result: Result<(), E>) -> HttpResponse {
    match result {
        Ok(()) => ok_response(),
        Err(e) => error_from_gnode(&e.into()),
    }
}

/// 读取中间件写入的调用方信息
pub fn auth_context(req: &HttpRequest) -> Option<AuthContext> {
    req.extensions().get::<AuthContext>().cloned()
}

/// 上传的文件字段
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

/// 解析后的 multipart 表单：文本字段和文件字段
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// 非空文本字段
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.is_empty()).cloned()
    }

    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|f| !f.data.is_empty())
    }
}

/// 读取整个 multipart 请求体
///
/// 带文件名的字段视为文件，其余按 UTF-8 文本读取。
pub async fn read_multipart(mut payload: Multipart) -> Result<MultipartForm, GnodeError> {
    let mut form = MultipartForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            GnodeError::validation(format!("Invalid multipart data: {}", e))
        })?;

        let name = field.name().unwrap_or("").to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk
                .map_err(|e| GnodeError::file_operation(format!("Failed to read field: {}", e)))?;
            if data.len() + bytes.len() > MAX_UPLOAD_SIZE {
                return Err(GnodeError::validation(format!(
                    "Field {} exceeds maximum {} KB",
                    name,
                    MAX_UPLOAD_SIZE / 1024
                )));
            }
            data.extend_from_slice(&bytes);
        }

        if filename.is_some() {
            form.files.insert(name, UploadedFile { filename, data });
        } else {
            form.fields
                .insert(name, String::from_utf8_lossy(&data).into_owned());
        }
    }

    Ok(form)
}
