use crate::config::GenerationConfig;
use crate::error::{AppError, AppResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// 生成服务返回的任务状态。未识别的字符串落入 Unknown 而不是解析失败,
/// 本地记录不会因为一个新状态字符串而丢失。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown(String),
}

impl ProviderJobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => ProviderJobStatus::Pending,
            "processing" => ProviderJobStatus::Processing,
            "completed" | "succeeded" => ProviderJobStatus::Completed,
            "failed" | "cancelled" => ProviderJobStatus::Failed,
            other => ProviderJobStatus::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderJobOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// 生成服务任务响应。已知字段解析成结构, 其余字段原样保留并透传给端上。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderJobResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ProviderJobOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ProviderJobResponse {
    /// 提供方在 id 与 job_id 两个字段名之间摇摆, 都接受
    pub fn job_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.job_id.as_deref())
    }

    pub fn parsed_status(&self) -> ProviderJobStatus {
        match self.status.as_deref() {
            Some(raw) => ProviderJobStatus::parse(raw),
            None => ProviderJobStatus::Unknown(String::new()),
        }
    }
}

/// 外部 AI 图片生成服务的客户端, 静态 Bearer Token 鉴权, 30 秒超时。
#[derive(Clone)]
pub struct GenerationApi {
    client: Client,
    config: GenerationConfig,
}

impl GenerationApi {
    pub fn new(config: GenerationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    pub async fn create_job(&self, body: &Value) -> AppResult<ProviderJobResponse> {
        let url = format!("{}/v1/images/generate", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Generation API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "Generation API returned {status}: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Generation API bad response: {e}")))
    }

    pub async fn get_job(&self, job_id: &str) -> AppResult<ProviderJobResponse> {
        let url = format!("{}/v1/jobs/{}", self.config.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Generation API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::UpstreamUnavailable(format!(
                "Generation API returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Generation API bad response: {e}")))
    }

    pub async fn cancel_job(&self, job_id: &str) -> AppResult<Value> {
        let url = format!("{}/v1/jobs/{}", self.config.base_url, job_id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Generation API error: {e}")))?;

        // 提供方的取消确认形态不稳定, 解析不了也不算失败
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// 下载参考图并编码为 data URI。MIME 以响应头的 content-type 为准,
    /// 存储的 mime_type 可能已过期, 仅作兜底。
    pub async fn fetch_image_as_data_uri(
        &self,
        image_url: &str,
        fallback_mime: &str,
    ) -> AppResult<String> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| {
                AppError::ValidationError(format!("Failed to download character photo: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ValidationError(format!(
                "Failed to download character photo: HTTP {}",
                response.status()
            )));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(fallback_mime)
            .to_string();

        let bytes = response.bytes().await.map_err(|e| {
            AppError::ValidationError(format!("Failed to download character photo: {e}"))
        })?;

        Ok(format!("data:{};base64,{}", mime, BASE64.encode(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_statuses() {
        assert_eq!(ProviderJobStatus::parse("pending"), ProviderJobStatus::Pending);
        assert_eq!(
            ProviderJobStatus::parse("Processing"),
            ProviderJobStatus::Processing
        );
        assert_eq!(
            ProviderJobStatus::parse("completed"),
            ProviderJobStatus::Completed
        );
        assert_eq!(
            ProviderJobStatus::parse("succeeded"),
            ProviderJobStatus::Completed
        );
        assert_eq!(ProviderJobStatus::parse("failed"), ProviderJobStatus::Failed);
        assert_eq!(
            ProviderJobStatus::parse("cancelled"),
            ProviderJobStatus::Failed
        );
    }

    #[test]
    fn test_parse_unknown_status_preserved() {
        assert_eq!(
            ProviderJobStatus::parse("queued_v2"),
            ProviderJobStatus::Unknown("queued_v2".to_string())
        );
    }

    #[test]
    fn test_job_id_field_fallback() {
        let with_id: ProviderJobResponse =
            serde_json::from_str(r#"{"id":"a1","status":"pending"}"#).unwrap();
        assert_eq!(with_id.job_id(), Some("a1"));

        let with_job_id: ProviderJobResponse =
            serde_json::from_str(r#"{"job_id":"b2","status":"pending"}"#).unwrap();
        assert_eq!(with_job_id.job_id(), Some("b2"));
    }
}
