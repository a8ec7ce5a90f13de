use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, warn};

use super::{SeaOrmStorage, map_db_err};
use crate::errors::{GnodeError, Result};
use crate::storage::models::{ApiToken, ApiTokenPatch, ApiTokenState, NewApiToken};
use crate::utils::generate_random_token;

use migration::entities::api_token;

/// API 令牌长度（字母数字）
pub const API_TOKEN_LENGTH: usize = 50;

fn to_token(model: api_token::Model) -> ApiToken {
    let state = ApiTokenState::from_i32(model.state).unwrap_or_else(|| {
        warn!(
            "API token {} has unknown state {}, treating as revoked",
            model.id, model.state
        );
        ApiTokenState::Revoked
    });

    ApiToken {
        id: model.id,
        token: model.token,
        state,
        created: model.created,
        till: model.till,
        description: model.description,
    }
}

impl SeaOrmStorage {
    pub async fn list_api_tokens(&self) -> Result<Vec<ApiToken>> {
        let tokens = api_token::Entity::find()
            .order_by_asc(api_token::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("查询 API 令牌", e))?;
        Ok(tokens.into_iter().map(to_token).collect())
    }

    pub async fn get_api_token(&self, id: i32) -> Result<Option<ApiToken>> {
        api_token::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map(|m| m.map(to_token))
            .map_err(|e| map_db_err("查询 API 令牌", e))
    }

    pub async fn find_api_token(&self, token: &str) -> Result<Option<ApiToken>> {
        api_token::Entity::find()
            .filter(api_token::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map(|m| m.map(to_token))
            .map_err(|e| map_db_err("查询 API 令牌", e))
    }

    /// 生成并保存新令牌
    pub async fn create_api_token(&self, params: NewApiToken) -> Result<ApiToken> {
        if params.till < 0 {
            return Err(GnodeError::validation("till 不能为负数"));
        }

        let model = api_token::ActiveModel {
            id: NotSet,
            token: Set(generate_random_token(API_TOKEN_LENGTH)),
            state: Set(ApiTokenState::Valid as i32),
            created: Set(chrono::Utc::now().timestamp()),
            till: Set(params.till),
            description: Set(params.description),
        }
        .insert(&self.db)
        .await
        .map_err(|e| map_db_err("API 令牌", e))?;

        info!("API token created: {}", model.id);
        Ok(to_token(model))
    }

    pub async fn update_api_token(&self, id: i32, patch: ApiTokenPatch) -> Result<ApiToken> {
        let existing = api_token::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("查询 API 令牌", e))?
            .ok_or_else(|| GnodeError::not_found(format!("API 令牌不存在: {}", id)))?;

        let mut active = existing.into_active_model();
        if let Some(state) = patch.state {
            active.state = Set(state as i32);
        }
        if let Some(till) = patch.till {
            active.till = Set(till);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err("更新 API 令牌", e))?;
        Ok(to_token(model))
    }

    pub async fn delete_api_token(&self, id: i32) -> Result<()> {
        let result = api_token::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("删除 API 令牌", e))?;

        if result.rows_affected == 0 {
            return Err(GnodeError::not_found(format!("API 令牌不存在: {}", id)));
        }
        info!("API token deleted: {}", id);
        Ok(())
    }
}
