use crate::entities::{
    character_entity as characters, generation_entity as generations, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// 获取用户资料与统计信息
    pub async fn get_user_profile(
        &self,
        user_id: i64,
    ) -> AppResult<(UserResponse, UserStatistics)> {
        let user = self.find_by_id(user_id).await?;

        let total_generations = generations::Entity::find()
            .filter(generations::Column::UserId.eq(user_id))
            .count(&self.pool)
            .await? as i64;
        let total_characters = characters::Entity::find()
            .filter(characters::Column::UserId.eq(user_id))
            .count(&self.pool)
            .await? as i64;

        Ok((
            UserResponse::from(user),
            UserStatistics {
                total_generations,
                total_characters,
            },
        ))
    }

    /// 更新资料, 仅写变化的字段
    pub async fn update_user_profile(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        if request.nick_name.is_none() && request.avatar_url.is_none() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }
        if let Some(nick) = &request.nick_name {
            if nick.is_empty() || nick.chars().count() > 32 {
                return Err(AppError::ValidationError(
                    "Nickname length must be between 1 and 32 characters".to_string(),
                ));
            }
        }

        let user = self.find_by_id(user_id).await?;

        let mut changed = false;
        let mut am = user.clone().into_active_model();
        if let Some(nick) = &request.nick_name {
            if user.nick_name.as_ref() != Some(nick) {
                am.nick_name = Set(Some(nick.clone()));
                changed = true;
            }
        }
        if let Some(avatar) = &request.avatar_url {
            if user.avatar_url.as_ref() != Some(avatar) {
                am.avatar_url = Set(Some(avatar.clone()));
                changed = true;
            }
        }

        let user = if changed {
            am.updated_at = Set(Some(Utc::now()));
            am.update(&self.pool).await?
        } else {
            user
        };

        Ok(UserResponse::from(user))
    }
}
