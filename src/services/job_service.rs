use crate::entities::{generation_entity as generations, GenerationStatus};
use crate::error::{AppError, AppResult};
use crate::external::{GenerationApi, ProviderJobResponse, ProviderJobStatus};
use crate::models::*;
use crate::services::{CharacterService, QuotaService};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::{json, Value};

/// 锁脸提示词前缀 (英文, 生成模型理解更稳)
const FACE_LOCK_PROMPT_PREFIX: &str = "Please reference the facial features from the following character image and generate an image that matches the requirements. Maintain consistent facial characteristics, face shape, and key features.\n\nStyle requirement: ";

pub(crate) fn compose_face_lock_prompt(prompt: &str) -> String {
    format!("{FACE_LOCK_PROMPT_PREFIX}{prompt}")
}

/// 未识别的提供方状态回落到 PENDING, 不因新状态字符串丢记录
pub(crate) fn map_provider_status(status: &ProviderJobStatus) -> GenerationStatus {
    match status {
        ProviderJobStatus::Pending => GenerationStatus::Pending,
        ProviderJobStatus::Processing => GenerationStatus::Processing,
        ProviderJobStatus::Completed => GenerationStatus::Completed,
        ProviderJobStatus::Failed => GenerationStatus::Failed,
        ProviderJobStatus::Unknown(raw) => {
            if !raw.is_empty() {
                log::warn!("Unrecognized provider status '{raw}', keeping PENDING");
            }
            GenerationStatus::Pending
        }
    }
}

#[derive(Clone)]
pub struct JobService {
    pool: DatabaseConnection,
    quota_service: QuotaService,
    character_service: CharacterService,
    generation_api: GenerationApi,
}

impl JobService {
    pub fn new(
        pool: DatabaseConnection,
        quota_service: QuotaService,
        character_service: CharacterService,
        generation_api: GenerationApi,
    ) -> Self {
        Self {
            pool,
            quota_service,
            character_service,
            generation_api,
        }
    }

    /// 创建生成任务。
    ///
    /// 流程: 锁脸解析 (请求校验, 失败不计配额) → 原子配额占位 (PENDING 记录,
    /// 此后本次尝试已计入今日配额) → 调用生成服务 → 回写 job_id。
    /// 提供方失败时记录置 FAILED 并原样上抛, 绝不吞掉写路径故障。
    pub async fn create_job(&self, user_id: i64, request: CreateJobRequest) -> AppResult<Value> {
        // 1. 锁脸: 取角色首张照片, 原图优先, 按响应头的实际类型重编码为 data URI
        let mut input_image = request.input_image.clone();
        let mut final_prompt = request.prompt.clone();
        let mut used_character_id: Option<String> = None;

        if let Some(character_id) = &request.character_id {
            let photos = self
                .character_service
                .get_character_photos(user_id, character_id)
                .await?;

            let photo = photos.first().ok_or_else(|| {
                AppError::NotFound(
                    "Selected character has no photos. Please upload photos first.".to_string(),
                )
            })?;

            let image_url = if !photo.original_url.is_empty() {
                &photo.original_url
            } else {
                &photo.thumbnail_url
            };

            input_image = Some(
                self.generation_api
                    .fetch_image_as_data_uri(image_url, &photo.mime_type)
                    .await?,
            );
            final_prompt = compose_face_lock_prompt(&request.prompt);
            used_character_id = Some(character_id.clone());

            log::info!("Using character {character_id} photo for face lock");
        }

        // 2. 原子配额占位, 落库的是原始提示词 (历史/界面永不展示注入的指令文本)
        let record_params = json!({
            "negative_prompt": request.negative_prompt,
            "model": request.model,
            "aspect_ratio": request.aspect_ratio,
            "resolution": request.resolution,
            "mode": request.mode,
            "character_id": used_character_id,
            "extra": request.params,
        });
        let generation = self
            .quota_service
            .reserve(user_id, request.prompt.clone(), Some(record_params))
            .await?;

        // 3. 组装上游请求; character_id 只是本地解析键, 永不上送
        let mut body = serde_json::Map::new();
        if let Some(extra) = &request.params {
            for (k, v) in extra {
                body.insert(k.clone(), v.clone());
            }
        }
        body.insert("prompt".to_string(), json!(final_prompt));
        if let Some(v) = &request.negative_prompt {
            body.insert("negative_prompt".to_string(), json!(v));
        }
        if let Some(v) = &request.model {
            body.insert("model".to_string(), json!(v));
        }
        if let Some(v) = &request.aspect_ratio {
            body.insert("aspect_ratio".to_string(), json!(v));
        }
        if let Some(v) = &request.resolution {
            body.insert("resolution".to_string(), json!(v));
        }
        body.insert(
            "mode".to_string(),
            json!(request.mode.clone().unwrap_or_else(|| "final".to_string())),
        );
        if let Some(image) = &input_image {
            body.insert("inputImage".to_string(), json!(image));
        }

        // 4. 调用提供方; 失败时该次尝试保持已计配额, 记录置 FAILED
        let response = match self.generation_api.create_job(&Value::Object(body)).await {
            Ok(response) => response,
            Err(e) => {
                let mut am = generation.into_active_model();
                am.status = Set(GenerationStatus::Failed);
                am.error_message = Set(Some(e.to_string()));
                am.update(&self.pool).await?;
                return Err(e);
            }
        };

        // 5. 回写提供方分配的 job_id
        let job_id = response.job_id().map(|s| s.to_string());
        let generation_id = generation.id;
        let mut am = generation.into_active_model();
        am.job_id = Set(job_id.clone());
        am.update(&self.pool).await?;

        log::info!(
            "Created job {} for user {user_id}, generation ID: {generation_id}",
            job_id.as_deref().unwrap_or("<none>")
        );

        let mut result = serde_json::to_value(&response)?;
        if let Some(obj) = result.as_object_mut() {
            obj.insert("generation_id".to_string(), json!(generation_id));
        }
        Ok(result)
    }

    /// 查询任务状态, 拉取式对账。
    ///
    /// 提供方可达: 按 job_id upsert 本地记录后返回最新状态;
    /// 提供方不可达: 记日志, 返回本地最后已知状态 (轮询端不应因此中断)。
    pub async fn get_job(&self, user_id: i64, job_id: &str) -> AppResult<Value> {
        match self.generation_api.get_job(job_id).await {
            Ok(response) => {
                self.apply_provider_state(job_id, &response).await?;
                let mut result = serde_json::to_value(&response)?;
                if let Some(local) = self.find_local(user_id, job_id).await? {
                    if let Some(obj) = result.as_object_mut() {
                        obj.insert("generation_id".to_string(), json!(local.id));
                    }
                }
                Ok(result)
            }
            Err(e) => {
                log::warn!("Failed to get job {job_id} from provider: {e}");
                let local = self
                    .find_local(user_id, job_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
                Ok(serde_json::to_value(GenerationResponse::from(local))?)
            }
        }
    }

    /// 取消任务: 通知提供方后, 本地记录无条件置 FAILED。
    /// 取消以本地为准, 远端是否认账不影响结果。
    pub async fn cancel_job(&self, user_id: i64, job_id: &str) -> AppResult<Value> {
        let response = self.generation_api.cancel_job(job_id).await?;

        if let Some(generation) = self.find_local(user_id, job_id).await? {
            let mut am = generation.into_active_model();
            am.status = Set(GenerationStatus::Failed);
            am.error_message = Set(Some("Cancelled by user".to_string()));
            am.update(&self.pool).await?;
        } else {
            log::warn!("Generation with job_id {job_id} not found on cancel");
        }

        Ok(response)
    }

    /// 用户任务历史, 新的在前
    pub async fn list_jobs(
        &self,
        user_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<GenerationResponse>> {
        let base_query =
            generations::Entity::find().filter(generations::Column::UserId.eq(user_id));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by(generations::Column::CreatedAt, Order::Desc)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(GenerationResponse::from)
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    pub async fn quota(&self, user_id: i64) -> AppResult<QuotaResponse> {
        self.quota_service.stats(user_id).await
    }

    /// 将提供方状态落到本地记录; 仅在状态变为 COMPLETED 时写 completed_at
    async fn apply_provider_state(
        &self,
        job_id: &str,
        response: &ProviderJobResponse,
    ) -> AppResult<()> {
        let generation = generations::Entity::find()
            .filter(generations::Column::JobId.eq(job_id))
            .one(&self.pool)
            .await?;

        let generation = match generation {
            Some(generation) => generation,
            None => {
                log::warn!("Generation with job_id {job_id} not found");
                return Ok(());
            }
        };

        let status = map_provider_status(&response.parsed_status());
        let mut am = generation.into_active_model();
        am.status = Set(status);
        if let Some(output) = &response.output {
            if let Some(image_url) = &output.image_url {
                am.image_url = Set(Some(image_url.clone()));
            }
            if let Some(thumbnail_url) = &output.thumbnail_url {
                am.thumbnail_url = Set(Some(thumbnail_url.clone()));
            }
        }
        if let Some(error) = &response.error {
            am.error_message = Set(Some(error.clone()));
        }
        if status == GenerationStatus::Completed {
            am.completed_at = Set(Some(Utc::now()));
        }
        am.update(&self.pool).await?;

        Ok(())
    }

    async fn find_local(
        &self,
        user_id: i64,
        job_id: &str,
    ) -> AppResult<Option<generations::Model>> {
        let generation = generations::Entity::find()
            .filter(generations::Column::JobId.eq(job_id))
            .filter(generations::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?;
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_lock_prompt_is_prefix_plus_original() {
        let original = "一只在月球上弹吉他的猫";
        let composed = compose_face_lock_prompt(original);
        assert!(composed.starts_with(FACE_LOCK_PROMPT_PREFIX));
        assert!(composed.ends_with(original));
        assert_eq!(
            composed,
            format!("{FACE_LOCK_PROMPT_PREFIX}{original}")
        );
    }

    #[test]
    fn test_map_provider_status_table() {
        assert_eq!(
            map_provider_status(&ProviderJobStatus::Pending),
            GenerationStatus::Pending
        );
        assert_eq!(
            map_provider_status(&ProviderJobStatus::Processing),
            GenerationStatus::Processing
        );
        assert_eq!(
            map_provider_status(&ProviderJobStatus::Completed),
            GenerationStatus::Completed
        );
        assert_eq!(
            map_provider_status(&ProviderJobStatus::Failed),
            GenerationStatus::Failed
        );
    }

    #[test]
    fn test_unknown_provider_status_falls_back_to_pending() {
        assert_eq!(
            map_provider_status(&ProviderJobStatus::Unknown("archived".to_string())),
            GenerationStatus::Pending
        );
    }
}
