use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};

use super::{SeaOrmStorage, map_db_err};
use crate::errors::{GnodeError, Result};
use crate::storage::models::CaFile;

use migration::entities::ca_file;

fn to_ca(model: ca_file::Model) -> CaFile {
    CaFile {
        id: model.id,
        description: model.description,
    }
}

impl SeaOrmStorage {
    pub async fn list_ca_files(&self) -> Result<Vec<CaFile>> {
        let files = ca_file::Entity::find()
            .order_by_asc(ca_file::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("查询 CA 文件", e))?;
        Ok(files.into_iter().map(to_ca).collect())
    }

    pub async fn get_ca_file(&self, id: &str) -> Result<Option<CaFile>> {
        ca_file::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map(|m| m.map(to_ca))
            .map_err(|e| map_db_err("查询 CA 文件", e))
    }

    pub async fn create_ca_file(&self, ca: CaFile) -> Result<CaFile> {
        let id = ca.id.clone();
        ca_file::ActiveModel {
            id: Set(ca.id),
            description: Set(ca.description),
        }
        .insert(&self.db)
        .await
        .map(to_ca)
        .map_err(|e| map_db_err(&format!("CA 文件 {}", id), e))
    }

    pub async fn update_ca_file(&self, id: &str, description: Option<String>) -> Result<CaFile> {
        let existing = ca_file::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("查询 CA 文件", e))?
            .ok_or_else(|| GnodeError::not_found(format!("CA 文件不存在: {}", id)))?;

        let mut active = existing.into_active_model();
        active.description = Set(description);
        active
            .update(&self.db)
            .await
            .map(to_ca)
            .map_err(|e| map_db_err("更新 CA 文件", e))
    }

    pub async fn delete_ca_file(&self, id: &str) -> Result<()> {
        let result = ca_file::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("删除 CA 文件", e))?;

        if result.rows_affected == 0 {
            return Err(GnodeError::not_found(format!("CA 文件不存在: {}", id)));
        }
        Ok(())
    }
}
