use crate::cache::RedisCache;
use crate::config::SmsMode;
use crate::error::{AppError, AppResult};
use crate::external::AliyunSmsService;
use crate::models::SendCodeResponse;
use crate::utils::{generate_six_digit_code, validate_cn_phone};

const CODE_PREFIX: &str = "sms:code:";
const CODE_TTL_SECONDS: u64 = 300;
const SEND_LIMIT_PREFIX: &str = "sms:limit:";
const SEND_LIMIT_TTL_SECONDS: u64 = 60;

/// 验证码存取: 短时效、一次性, 全部状态在缓存中 (键: 手机号)。
#[derive(Clone)]
pub struct SmsService {
    cache: RedisCache,
    gateway: AliyunSmsService,
    mode: SmsMode,
}

impl SmsService {
    pub fn new(cache: RedisCache, gateway: AliyunSmsService, mode: SmsMode) -> Self {
        Self {
            cache,
            gateway,
            mode,
        }
    }

    /// 下发验证码。
    ///
    /// 60 秒内重复请求返回 RateLimited; aliyun 模式网关失败则整个操作失败,
    /// 验证码绝不因网关故障而回落到明文回显。
    pub async fn send_verification_code(&self, phone: &str) -> AppResult<SendCodeResponse> {
        validate_cn_phone(phone)?;

        // 检查发送频率限制 (60秒内最多1次)
        let limit_key = format!("{SEND_LIMIT_PREFIX}{phone}");
        if self.cache.exists(&limit_key).await? {
            return Err(AppError::RateLimited(
                "Please wait 60 seconds before requesting another code".to_string(),
            ));
        }

        let code = generate_six_digit_code();

        let code_key = format!("{CODE_PREFIX}{phone}");
        self.cache
            .set_ex(&code_key, &code, CODE_TTL_SECONDS)
            .await?;
        self.cache
            .set_ex(&limit_key, "1", SEND_LIMIT_TTL_SECONDS)
            .await?;

        match self.mode {
            SmsMode::Mock => {
                log::info!("[MOCK SMS] Sending code {code} to {phone}");
                Ok(SendCodeResponse {
                    expires_in: CODE_TTL_SECONDS as i64,
                    code: Some(code),
                })
            }
            SmsMode::Aliyun => {
                self.gateway.send_verification_code(phone, &code).await?;
                Ok(SendCodeResponse {
                    expires_in: CODE_TTL_SECONDS as i64,
                    code: None,
                })
            }
        }
    }

    /// 校验验证码: 精确匹配, 成功即删除 (一次性, TTL 窗口内也不可重放)
    pub async fn verify_code(&self, phone: &str, code: &str) -> AppResult<bool> {
        let code_key = format!("{CODE_PREFIX}{phone}");

        let stored = match self.cache.get(&code_key).await? {
            Some(stored) => stored,
            None => return Ok(false),
        };

        if stored != code {
            return Ok(false);
        }

        self.cache.delete(&code_key).await?;
        Ok(true)
    }
}
