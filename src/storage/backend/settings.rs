use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, EntityTrait, Set};

use super::{SeaOrmStorage, map_db_err};
use crate::errors::Result;
use crate::storage::models::Settings;

use migration::entities::settings;

/// 设置表只有一行
const SETTINGS_ROW_ID: i32 = 1;

fn to_settings(model: settings::Model) -> Settings {
    Settings {
        api_authentication: model.api_authentication,
        gcloud: model.gcloud,
    }
}

impl SeaOrmStorage {
    /// 读取设置行；返回 (设置, 是否为新建)
    pub async fn load_or_create_settings(&self) -> Result<(Settings, bool)> {
        if let Some(model) = settings::Entity::find_by_id(SETTINGS_ROW_ID)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("读取设置", e))?
        {
            return Ok((to_settings(model), false));
        }

        let defaults = Settings::default();
        let model = settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            api_authentication: Set(defaults.api_authentication),
            gcloud: Set(defaults.gcloud),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_db_err("初始化设置", e))?;

        Ok((to_settings(model), true))
    }

    pub async fn save_api_authentication(&self, enabled: bool) -> Result<Settings> {
        settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            api_authentication: Set(enabled),
            gcloud: NotSet,
        }
        .update(&self.db)
        .await
        .map(to_settings)
        .map_err(|e| map_db_err("保存设置", e))
    }
}
