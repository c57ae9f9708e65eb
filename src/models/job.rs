use crate::entities::{generation_entity as generations, GenerationStatus, VipLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    #[schema(example = "一只在月球上弹吉他的猫")]
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub mode: Option<String>,
    /// 锁脸: 指定角色后取其照片作为参考图, 不上送给生成服务
    pub character_id: Option<String>,
    /// 直接内联的参考图 (data URI), 与 character_id 互斥时以角色照片为准
    pub input_image: Option<String>,
    /// 透传给生成服务的附加参数
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub params: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub id: i64,
    pub job_id: Option<String>,
    pub prompt: String,
    pub status: GenerationStatus,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<generations::Model> for GenerationResponse {
    fn from(gen: generations::Model) -> Self {
        Self {
            id: gen.id,
            job_id: gen.job_id,
            prompt: gen.prompt,
            status: gen.status,
            image_url: gen.image_url,
            thumbnail_url: gen.thumbnail_url,
            error_message: gen.error_message,
            created_at: gen.created_at,
            completed_at: gen.completed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaResponse {
    pub vip_level: VipLevel,
    pub daily_limit: i64,
    pub today_used: i64,
    pub today_remaining: i64,
    pub total_generations: i64,
}
