use crate::entities::{character_entity as characters, character_photo_entity as photos};
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// 每个角色的照片硬上限, 添加时检查
const MAX_PHOTOS_PER_CHARACTER: u64 = 10;

#[derive(Clone)]
pub struct CharacterService {
    pool: DatabaseConnection,
}

impl CharacterService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_character(
        &self,
        user_id: i64,
        request: CreateCharacterRequest,
    ) -> AppResult<CharacterResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Character name must not be empty".to_string(),
            ));
        }

        let model = characters::ActiveModel {
            uuid: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id),
            name: Set(request.name),
            description: Set(request.description),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(CharacterResponse::from_model(model, 0))
    }

    pub async fn list_characters(&self, user_id: i64) -> AppResult<Vec<CharacterResponse>> {
        let list = characters::Entity::find()
            .filter(characters::Column::UserId.eq(user_id))
            .order_by(characters::Column::CreatedAt, Order::Desc)
            .all(&self.pool)
            .await?;

        let mut responses = Vec::with_capacity(list.len());
        for character in list {
            let photo_count = photos::Entity::find()
                .filter(photos::Column::CharacterId.eq(character.id))
                .count(&self.pool)
                .await? as i64;
            responses.push(CharacterResponse::from_model(character, photo_count));
        }
        Ok(responses)
    }

    /// 角色照片 (归属检查): 他人的角色返回 Forbidden。
    /// 锁脸流程从这里取参考图。
    pub async fn get_character_photos(
        &self,
        user_id: i64,
        character_uuid: &str,
    ) -> AppResult<Vec<photos::Model>> {
        let character = self.find_owned_character(user_id, character_uuid).await?;

        let list = photos::Entity::find()
            .filter(photos::Column::CharacterId.eq(character.id))
            .order_by(photos::Column::CreatedAt, Order::Asc)
            .all(&self.pool)
            .await?;
        Ok(list)
    }

    pub async fn add_photo(
        &self,
        user_id: i64,
        character_uuid: &str,
        request: AddPhotoRequest,
    ) -> AppResult<CharacterPhotoResponse> {
        let character = self.find_owned_character(user_id, character_uuid).await?;

        let photo_count = photos::Entity::find()
            .filter(photos::Column::CharacterId.eq(character.id))
            .count(&self.pool)
            .await?;
        if photo_count >= MAX_PHOTOS_PER_CHARACTER {
            return Err(AppError::ValidationError(format!(
                "Maximum {MAX_PHOTOS_PER_CHARACTER} photos per character allowed"
            )));
        }

        let model = photos::ActiveModel {
            uuid: Set(Uuid::new_v4().to_string()),
            character_id: Set(character.id),
            thumbnail_url: Set(request.thumbnail_url),
            original_url: Set(request.original_url),
            mime_type: Set(request
                .mime_type
                .unwrap_or_else(|| "image/jpeg".to_string())),
            thumbnail_size: Set(request.thumbnail_size.unwrap_or(0)),
            original_size: Set(request.original_size.unwrap_or(0)),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(CharacterPhotoResponse::from(model))
    }

    async fn find_owned_character(
        &self,
        user_id: i64,
        character_uuid: &str,
    ) -> AppResult<characters::Model> {
        let character = characters::Entity::find()
            .filter(characters::Column::Uuid.eq(character_uuid))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Character not found".to_string()))?;

        if character.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(character)
    }
}
