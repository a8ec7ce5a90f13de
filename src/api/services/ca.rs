//! CA 证书端点
//!
//! 元数据保存在数据库，证书内容保存在 `system.ca_dir/<id>`。

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{GnodeError, Result};
use crate::storage::{CaFile, SeaOrmStorage};

use super::helpers::{api_ok, api_result, read_multipart};
use super::types::CaFileId;

/// CA 证书文件目录
#[derive(Debug, Clone)]
pub struct CaStore {
    dir: PathBuf,
}

impl CaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 证书 id 直接作为文件名，不允许路径分隔
    pub fn validate_id(id: &str) -> Result<()> {
        if id.contains('/') {
            return Err(GnodeError::validation("/ is not allowed"));
        }
        if id.is_empty() || id == "." || id == ".." {
            return Err(GnodeError::validation(format!("Invalid CA id: {:?}", id)));
        }
        Ok(())
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    pub async fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(id), data).await?;
        Ok(())
    }

    pub async fn remove(&self, id: &str) {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove CA file {}: {}", id, e),
        }
    }
}

async fn add(payload: Multipart, storage: &SeaOrmStorage, store: &CaStore) -> Result<CaFileId> {
    let mut form = read_multipart(payload).await?;
    let cafile = form
        .file("cafile")
        .ok_or_else(|| GnodeError::validation("Missing required field: cafile"))?;

    let id = form
        .text("ca_id")
        .or_else(|| cafile.filename.clone())
        .unwrap_or_default();
    CaStore::validate_id(&id)?;

    storage
        .create_ca_file(CaFile {
            id: id.clone(),
            description: form.text("description"),
        })
        .await?;

    if let Err(e) = store.write(&id, &cafile.data).await {
        // 文件写入失败时回滚元数据
        if let Err(rollback) = storage.delete_ca_file(&id).await {
            warn!("Failed to roll back CA metadata {}: {}", id, rollback);
        }
        return Err(e);
    }

    info!("CA file stored: {}", id);
    Ok(CaFileId { id })
}

async fn edit(
    id: String,
    payload: Multipart,
    storage: &SeaOrmStorage,
    store: &CaStore,
) -> Result<CaFileId> {
    let mut form = read_multipart(payload).await?;
    storage.update_ca_file(&id, form.text("description")).await?;

    if let Some(cafile) = form.file("cafile") {
        store.write(&id, &cafile.data).await?;
        info!("CA file replaced: {}", id);
    }
    Ok(CaFileId { id })
}

pub async fn create_ca(
    payload: Multipart,
    storage: web::Data<Arc<SeaOrmStorage>>,
    store: web::Data<Arc<CaStore>>,
) -> HttpResponse {
    api_result(add(payload, &storage, &store).await)
}

pub async fn list_ca(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
    api_result(storage.list_ca_files().await)
}

pub async fn get_ca(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> HttpResponse {
    api_result(
        storage
            .get_ca_file(&path)
            .await
            .and_then(|f| f.ok_or_else(|| GnodeError::not_found("File not found"))),
    )
}

pub async fn update_ca(
    path: web::Path<String>,
    payload: Multipart,
    storage: web::Data<Arc<SeaOrmStorage>>,
    store: web::Data<Arc<CaStore>>,
) -> HttpResponse {
    api_result(edit(path.into_inner(), payload, &storage, &store).await)
}

pub async fn delete_ca(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
    store: web::Data<Arc<CaStore>>,
) -> HttpResponse {
    let id = path.into_inner();
    let result = storage.delete_ca_file(&id).await;
    if result.is_ok() {
        store.remove(&id).await;
    }
    api_ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_id_must_be_a_plain_file_name() {
        assert!(CaStore::validate_id("root.pem").is_ok());
        assert!(CaStore::validate_id("../etc/passwd").is_err());
        assert!(CaStore::validate_id("..").is_err());
        assert!(CaStore::validate_id("").is_err());
    }

    #[tokio::test]
    async fn test_write_and_remove() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CaStore::new(dir.path().join("ca"));

        store.write("root.pem", b"PEM").await.unwrap();
        assert_eq!(std::fs::read(store.path_for("root.pem")).unwrap(), b"PEM");

        store.remove("root.pem").await;
        store.remove("root.pem").await;
        assert!(!store.path_for("root.pem").exists());
    }
}
