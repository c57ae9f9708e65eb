use crate::entities::{character_entity as characters, character_photo_entity as photos};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCharacterRequest {
    #[schema(example = "小梦")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddPhotoRequest {
    pub thumbnail_url: String,
    pub original_url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub thumbnail_size: Option<i32>,
    #[serde(default)]
    pub original_size: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CharacterResponse {
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub photo_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl CharacterResponse {
    pub fn from_model(character: characters::Model, photo_count: i64) -> Self {
        Self {
            uuid: character.uuid,
            name: character.name,
            description: character.description,
            photo_count,
            created_at: character.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CharacterPhotoResponse {
    pub uuid: String,
    pub thumbnail_url: String,
    pub original_url: String,
    pub mime_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<photos::Model> for CharacterPhotoResponse {
    fn from(photo: photos::Model) -> Self {
        Self {
            uuid: photo.uuid,
            thumbnail_url: photo.thumbnail_url,
            original_url: photo.original_url,
            mime_type: photo.mime_type,
            created_at: photo.created_at,
        }
    }
}
