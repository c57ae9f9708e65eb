use crate::entities::{user_entity as users, VipLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
    pub vip_level: VipLevel,
    pub vip_expire_at: Option<DateTime<Utc>>,
    pub points_balance: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            openid: user.openid,
            phone: user.phone,
            nick_name: user.nick_name,
            avatar_url: user.avatar_url,
            vip_level: user.vip_level,
            vip_expire_at: user.vip_expire_at,
            points_balance: user.points_balance,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "小梦")]
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserStatistics {
    pub total_generations: i64,
    pub total_characters: i64,
}
