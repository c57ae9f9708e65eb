use crate::config::WechatConfig;
use crate::error::{AppError, AppResult};
use aes::Aes128;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[derive(Debug, Deserialize)]
pub struct Code2SessionResponse {
    pub openid: Option<String>,
    pub session_key: Option<String>,
    pub unionid: Option<String>,
    pub errcode: Option<i64>,
    pub errmsg: Option<String>,
}

/// code2session 成功后的会话凭据
#[derive(Debug, Clone)]
pub struct WechatSession {
    pub openid: String,
    pub session_key: String,
    pub unionid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhoneInfo {
    #[serde(rename = "purePhoneNumber")]
    pure_phone_number: Option<String>,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhoneNumberResponse {
    errcode: Option<i64>,
    errmsg: Option<String>,
    phone_info: Option<PhoneInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecryptedPhonePayload {
    #[serde(rename = "purePhoneNumber")]
    pure_phone_number: Option<String>,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
}

/// 带过期时间的 access_token 缓存值
#[derive(Debug, Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// 微信小程序身份服务的客户端。
///
/// access_token 缓存在单个互斥锁之后: 并发刷新会合并为一次在途请求,
/// 剩余有效期不足 5 分钟时惰性刷新。
#[derive(Clone)]
pub struct WechatApi {
    client: Client,
    config: WechatConfig,
    access_token: Arc<Mutex<Option<CachedAccessToken>>>,
}

impl WechatApi {
    pub fn new(config: WechatConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            access_token: Arc::new(Mutex::new(None)),
        }
    }

    /// 用授权 code 换取 (openid, session_key[, unionid])
    pub async fn code2session(&self, code: &str) -> AppResult<WechatSession> {
        let url = format!("{}/sns/jscode2session", self.config.api_url);

        let response: Code2SessionResponse = self
            .client
            .get(&url)
            .query(&[
                ("appid", self.config.appid.as_str()),
                ("secret", self.config.secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if let Some(errcode) = response.errcode {
            if errcode != 0 {
                return Err(AppError::InvalidCredential(format!(
                    "WeChat code2session failed: {}",
                    response.errmsg.unwrap_or_default()
                )));
            }
        }

        match (response.openid, response.session_key) {
            (Some(openid), Some(session_key)) => Ok(WechatSession {
                openid,
                session_key,
                unionid: response.unionid,
            }),
            _ => Err(AppError::InvalidCredential(
                "WeChat code2session returned no session".to_string(),
            )),
        }
    }

    /// 新版方式：通过 phone_code 获取手机号 (access_token 网关接口)
    pub async fn get_phone_by_code(&self, phone_code: &str) -> AppResult<Option<String>> {
        let access_token = self.get_access_token().await?;
        let url = format!(
            "{}/wxa/business/getuserphonenumber?access_token={}",
            self.config.api_url, access_token
        );

        let response: PhoneNumberResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "code": phone_code }))
            .send()
            .await?
            .json()
            .await?;

        if response.errcode == Some(0) {
            if let Some(info) = response.phone_info {
                return Ok(info.pure_phone_number.or(info.phone_number));
            }
        }

        log::warn!(
            "Failed to get phone by code: {}",
            response.errmsg.unwrap_or_default()
        );
        Ok(None)
    }

    /// 旧版方式：用 session_key 解密手机号载荷 (AES-128-CBC, PKCS7)
    pub fn decrypt_phone(encrypted_data: &str, iv: &str, session_key: &str) -> Option<String> {
        let key = BASE64.decode(session_key).ok()?;
        let iv = BASE64.decode(iv).ok()?;
        let mut data = BASE64.decode(encrypted_data).ok()?;

        let decryptor = Aes128CbcDec::new_from_slices(&key, &iv).ok()?;
        let plaintext = decryptor.decrypt_padded_mut::<Pkcs7>(&mut data).ok()?;

        let payload: DecryptedPhonePayload = serde_json::from_slice(plaintext).ok()?;
        payload.pure_phone_number.or(payload.phone_number)
    }

    /// 获取 access_token。锁横跨整个刷新过程, 并发调用只会触发一次上游请求。
    async fn get_access_token(&self) -> AppResult<String> {
        let mut cached = self.access_token.lock().await;

        // 提前 5 分钟刷新
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::minutes(5) {
                return Ok(token.token.clone());
            }
        }

        let url = format!("{}/cgi-bin/token", self.config.api_url);
        let response: AccessTokenResponse = self
            .client
            .get(&url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.config.appid.as_str()),
                ("secret", self.config.secret.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        if let Some(errcode) = response.errcode {
            if errcode != 0 {
                return Err(AppError::UpstreamUnavailable(format!(
                    "Failed to get access_token: {}",
                    response.errmsg.unwrap_or_default()
                )));
            }
        }

        let token = response.access_token.ok_or_else(|| {
            AppError::UpstreamUnavailable("Access token response was empty".to_string())
        })?;
        let expires_in = response.expires_in.unwrap_or(7200);

        log::info!("Refreshed WeChat access_token, expires in {expires_in}s");

        *cached = Some(CachedAccessToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<Aes128>;

    fn encrypt_payload(payload: &str, key: &[u8; 16], iv: &[u8; 16]) -> String {
        let ciphertext = Aes128CbcEnc::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(payload.as_bytes());
        BASE64.encode(ciphertext)
    }

    #[test]
    fn test_decrypt_phone_payload() {
        let key = [7u8; 16];
        let iv = [3u8; 16];
        let payload = r#"{"phoneNumber":"13800000000","purePhoneNumber":"13800000000"}"#;

        let encrypted = encrypt_payload(payload, &key, &iv);
        let phone = WechatApi::decrypt_phone(&encrypted, &BASE64.encode(iv), &BASE64.encode(key));

        assert_eq!(phone.as_deref(), Some("13800000000"));
    }

    #[test]
    fn test_decrypt_phone_rejects_garbage() {
        assert_eq!(WechatApi::decrypt_phone("not-base64!", "aaaa", "bbbb"), None);
    }
}
