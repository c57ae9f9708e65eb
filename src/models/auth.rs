use crate::entities::VipLevel;
use crate::models::UserResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 小程序端 getUserProfile 带来的公开资料
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WechatUserInfo {
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WechatLoginRequest {
    /// wx.login 返回的授权 code
    pub code: String,
    pub user_info: Option<WechatUserInfo>,
    /// 新版手机号授权 code, 优先使用
    pub phone_code: Option<String>,
    /// 旧版加密数据兜底 (encrypted_data + iv, 用 session_key 解密)
    pub encrypted_data: Option<String>,
    pub iv: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendCodeRequest {
    #[schema(example = "13800000000")]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendCodeResponse {
    pub expires_in: i64,
    /// 仅 mock 模式回显验证码, 生产投递模式下永不返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PhoneLoginRequest {
    #[schema(example = "13800000000")]
    pub phone: String,
    #[schema(example = "123456")]
    pub code: String,
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BindPhoneRequest {
    #[schema(example = "13800000000")]
    pub phone: String,
    #[schema(example = "123456")]
    pub code: String,
    /// 检测到冲突时是否同意合并对方账号
    #[serde(default)]
    pub merge: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// 冲突账号的公开资料, 供端上在用户确认合并前展示
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConflictAccount {
    pub id: i64,
    pub nick_name: Option<String>,
    pub avatar_url: Option<String>,
    pub vip_level: VipLevel,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountConflictInfo {
    pub conflict_type: String,
    pub existing_account: ConflictAccount,
    pub message: String,
}
