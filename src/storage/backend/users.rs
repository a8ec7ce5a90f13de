use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use super::{SeaOrmStorage, map_db_err};
use crate::errors::{GnodeError, Result};
use crate::storage::models::User;

use migration::entities::user;

fn to_user(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        hashed_password: model.hashed_password,
        is_active: model.is_active,
        is_admin: model.is_admin,
    }
}

impl SeaOrmStorage {
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("查询用户列表", e))?;
        Ok(users.into_iter().map(to_user).collect())
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map(|m| m.map(to_user))
            .map_err(|e| map_db_err("查询用户", e))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map(|m| m.map(to_user))
            .map_err(|e| map_db_err("查询用户", e))
    }

    /// 最早创建的用户（默认用户），不可删除
    pub async fn first_user_id(&self) -> Result<Option<i32>> {
        user::Entity::find()
            .order_by_asc(user::Column::Id)
            .one(&self.db)
            .await
            .map(|m| m.map(|m| m.id))
            .map_err(|e| map_db_err("查询用户", e))
    }

    pub async fn count_users(&self) -> Result<u64> {
        user::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| map_db_err("统计用户", e))
    }

    /// 创建用户，`hashed_password` 必须已经过 Argon2 哈希
    pub async fn create_user(
        &self,
        username: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User> {
        let model = user::ActiveModel {
            id: NotSet,
            username: Set(username.to_string()),
            hashed_password: Set(hashed_password.to_string()),
            is_active: Set(true),
            is_admin: Set(is_admin),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_db_err(&format!("用户 {}", username), e))?;

        info!("User created: {}", username);
        Ok(to_user(model))
    }

    pub async fn delete_user(&self, id: i32) -> Result<()> {
        let result = user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("删除用户", e))?;

        if result.rows_affected == 0 {
            return Err(GnodeError::not_found(format!("用户不存在: {}", id)));
        }

        info!("User deleted: {}", id);
        Ok(())
    }
}
