use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use tracing::info;

use super::{SeaOrmStorage, map_db_err};
use crate::errors::{GnodeError, Result};
use crate::storage::models::AuthBundle;

use migration::entities::authbundle;

fn to_bundle(model: authbundle::Model) -> AuthBundle {
    AuthBundle {
        authbundle_id: model.authbundle_id,
        service_type: model.service_type,
        auth_type: model.auth_type,
        username: model.username,
        password: model.password,
        keyname: model.keyname,
        keydata: model.keydata,
        description: model.description,
    }
}

fn to_active(bundle: AuthBundle) -> authbundle::ActiveModel {
    authbundle::ActiveModel {
        authbundle_id: Set(bundle.authbundle_id),
        service_type: Set(bundle.service_type),
        auth_type: Set(bundle.auth_type),
        username: Set(bundle.username),
        password: Set(bundle.password),
        keyname: Set(bundle.keyname),
        keydata: Set(bundle.keydata),
        description: Set(bundle.description),
    }
}

impl SeaOrmStorage {
    pub async fn list_authbundles(&self) -> Result<Vec<AuthBundle>> {
        let bundles = authbundle::Entity::find()
            .order_by_asc(authbundle::Column::AuthbundleId)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("查询认证包", e))?;
        Ok(bundles.into_iter().map(to_bundle).collect())
    }

    pub async fn get_authbundle(&self, id: &str) -> Result<Option<AuthBundle>> {
        authbundle::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map(|m| m.map(to_bundle))
            .map_err(|e| map_db_err("查询认证包", e))
    }

    pub async fn create_authbundle(&self, bundle: AuthBundle) -> Result<AuthBundle> {
        let id = bundle.authbundle_id.clone();
        let model = to_active(bundle)
            .insert(&self.db)
            .await
            .map_err(|e| map_db_err(&format!("认证包 {}", id), e))?;

        info!("Authbundle created: {}", id);
        Ok(to_bundle(model))
    }

    /// 覆盖已有认证包；`keydata` 为 None 时保留原有密钥
    pub async fn update_authbundle(&self, bundle: AuthBundle) -> Result<AuthBundle> {
        let existing = authbundle::Entity::find_by_id(bundle.authbundle_id.clone())
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("查询认证包", e))?
            .ok_or_else(|| {
                GnodeError::not_found(format!("认证包不存在: {}", bundle.authbundle_id))
            })?;

        let mut active = existing.into_active_model();
        active.service_type = Set(bundle.service_type);
        active.auth_type = Set(bundle.auth_type);
        active.username = Set(bundle.username);
        active.password = Set(bundle.password);
        active.description = Set(bundle.description);
        if bundle.keydata.is_some() {
            active.keyname = Set(bundle.keyname);
            active.keydata = Set(bundle.keydata);
        }

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err("更新认证包", e))?;
        Ok(to_bundle(model))
    }

    pub async fn delete_authbundle(&self, id: &str) -> Result<()> {
        let result = authbundle::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("删除认证包", e))?;

        if result.rows_affected == 0 {
            return Err(GnodeError::not_found(format!("认证包不存在: {}", id)));
        }
        info!("Authbundle deleted: {}", id);
        Ok(())
    }
}
