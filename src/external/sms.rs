use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SendSmsResponse {
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "BizId")]
    pub biz_id: Option<String>,
}

/// 阿里云短信网关客户端。仅生产投递模式使用; 协议细节之外的东西
/// (模板审核、签名备案) 都在网关侧。
#[derive(Clone)]
pub struct AliyunSmsService {
    client: Client,
    config: SmsConfig,
}

impl AliyunSmsService {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn send_verification_code(&self, phone: &str, code: &str) -> AppResult<()> {
        let url = "https://dysmsapi.aliyuncs.com/";

        let template_param = serde_json::json!({ "code": code }).to_string();
        let params = [
            ("Action", "SendSms"),
            ("PhoneNumbers", phone),
            ("SignName", &self.config.aliyun_sign_name),
            ("TemplateCode", &self.config.aliyun_template_code),
            ("TemplateParam", &template_param),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.config.aliyun_access_key_id,
                Some(&self.config.aliyun_access_key_secret),
            )
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::DeliveryFailed(format!("SMS gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Verification code SMS failed to send: {phone}, Error: {error_text}");
            return Err(AppError::DeliveryFailed(format!(
                "SMS sending failed: {error_text}"
            )));
        }

        let body: SendSmsResponse = response
            .json()
            .await
            .map_err(|e| AppError::DeliveryFailed(format!("SMS gateway bad response: {e}")))?;

        if body.code.as_deref() == Some("OK") {
            log::info!(
                "Verification code SMS sent successfully: {phone}, BizId: {}",
                body.biz_id.unwrap_or_default()
            );
            Ok(())
        } else {
            let message = body.message.unwrap_or_else(|| "SMS send failed".to_string());
            log::error!("Verification code SMS rejected: {phone}, {message}");
            Err(AppError::DeliveryFailed(message))
        }
    }
}
