use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use tracing::info;

use super::{SeaOrmStorage, map_db_err};
use crate::errors::{GnodeError, Result};
use crate::storage::models::Device;

use migration::entities::device;

fn to_device(model: device::Model) -> Device {
    Device {
        id: model.id,
        device_type: model.device_type,
        enabled: model.enabled,
        description: model.description,
    }
}

impl SeaOrmStorage {
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let devices = device::Entity::find()
            .order_by_asc(device::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("查询设备", e))?;
        Ok(devices.into_iter().map(to_device).collect())
    }

    pub async fn get_device(&self, id: &str) -> Result<Option<Device>> {
        device::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map(|m| m.map(to_device))
            .map_err(|e| map_db_err("查询设备", e))
    }

    pub async fn create_device(&self, dev: Device) -> Result<Device> {
        let id = dev.id.clone();
        let model = device::ActiveModel {
            id: Set(dev.id),
            device_type: Set(dev.device_type),
            enabled: Set(dev.enabled),
            description: Set(dev.description),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_db_err(&format!("设备 {}", id), e))?;

        info!("Device created: {}", id);
        Ok(to_device(model))
    }

    pub async fn update_device(&self, dev: Device) -> Result<Device> {
        let existing = device::Entity::find_by_id(dev.id.clone())
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("查询设备", e))?
            .ok_or_else(|| GnodeError::not_found(format!("设备不存在: {}", dev.id)))?;

        let mut active = existing.into_active_model();
        active.device_type = Set(dev.device_type);
        active.enabled = Set(dev.enabled);
        active.description = Set(dev.description);

        active
            .update(&self.db)
            .await
            .map(to_device)
            .map_err(|e| map_db_err("更新设备", e))
    }

    pub async fn delete_device(&self, id: &str) -> Result<()> {
        let result = device::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("删除设备", e))?;

        if result.rows_affected == 0 {
            return Err(GnodeError::not_found(format!("设备不存在: {}", id)));
        }
        info!("Device deleted: {}", id);
        Ok(())
    }
}
