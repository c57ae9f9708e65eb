use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub wechat: WechatConfig,
    pub sms: SmsConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WechatConfig {
    pub appid: String,
    pub secret: String,
    #[serde(default = "default_wechat_api_url")]
    pub api_url: String,
}

fn default_wechat_api_url() -> String {
    "https://api.weixin.qq.com".to_string()
}

/// 短信发送模式: mock 模式直接回显验证码 (仅测试环境), aliyun 模式走短信网关
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmsMode {
    Mock,
    Aliyun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub mode: SmsMode,
    #[serde(default)]
    pub aliyun_access_key_id: String,
    #[serde(default)]
    pub aliyun_access_key_secret: String,
    #[serde(default)]
    pub aliyun_sign_name: String,
    #[serde(default)]
    pub aliyun_template_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_daily_limit_normal")]
    pub daily_limit_normal: i64,
    #[serde(default = "default_daily_limit_vip")]
    pub daily_limit_vip: i64,
    #[serde(default = "default_daily_limit_svip")]
    pub daily_limit_svip: i64,
}

fn default_daily_limit_normal() -> i64 {
    2
}
fn default_daily_limit_vip() -> i64 {
    20
}
fn default_daily_limit_svip() -> i64 {
    100
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    redis: RedisConfig {
                        url: get_env("REDIS_URL")
                            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        expires_in: get_env_parse("JWT_EXPIRES_IN", 604_800i64),
                    },
                    wechat: WechatConfig {
                        appid: get_env("WECHAT_APPID").unwrap_or_default(),
                        secret: get_env("WECHAT_SECRET").unwrap_or_default(),
                        api_url: get_env("WECHAT_API_URL").unwrap_or_else(default_wechat_api_url),
                    },
                    sms: SmsConfig {
                        mode: match get_env("SMS_MODE").as_deref() {
                            Some("aliyun") => SmsMode::Aliyun,
                            _ => SmsMode::Mock,
                        },
                        aliyun_access_key_id: get_env("ALIYUN_SMS_ACCESS_KEY_ID")
                            .unwrap_or_default(),
                        aliyun_access_key_secret: get_env("ALIYUN_SMS_ACCESS_KEY_SECRET")
                            .unwrap_or_default(),
                        aliyun_sign_name: get_env("ALIYUN_SMS_SIGN_NAME").unwrap_or_default(),
                        aliyun_template_code: get_env("ALIYUN_SMS_TEMPLATE_CODE")
                            .unwrap_or_default(),
                    },
                    generation: GenerationConfig {
                        base_url: get_env("GENERATION_API_BASE_URL")
                            .unwrap_or_else(|| "http://localhost:3001".to_string()),
                        api_key: get_env("GENERATION_API_KEY").unwrap_or_default(),
                        daily_limit_normal: get_env_parse(
                            "GENERATION_DAILY_LIMIT_NORMAL",
                            default_daily_limit_normal(),
                        ),
                        daily_limit_vip: get_env_parse(
                            "GENERATION_DAILY_LIMIT_VIP",
                            default_daily_limit_vip(),
                        ),
                        daily_limit_svip: get_env_parse(
                            "GENERATION_DAILY_LIMIT_SVIP",
                            default_daily_limit_svip(),
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("REDIS_URL") {
            config.redis.url = v;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.expires_in = n;
            }
        }
        if let Ok(v) = env::var("WECHAT_APPID") {
            config.wechat.appid = v;
        }
        if let Ok(v) = env::var("WECHAT_SECRET") {
            config.wechat.secret = v;
        }
        if let Ok(v) = env::var("WECHAT_API_URL") {
            config.wechat.api_url = v;
        }
        if let Ok(v) = env::var("SMS_MODE") {
            config.sms.mode = if v == "aliyun" {
                SmsMode::Aliyun
            } else {
                SmsMode::Mock
            };
        }
        if let Ok(v) = env::var("ALIYUN_SMS_ACCESS_KEY_ID") {
            config.sms.aliyun_access_key_id = v;
        }
        if let Ok(v) = env::var("ALIYUN_SMS_ACCESS_KEY_SECRET") {
            config.sms.aliyun_access_key_secret = v;
        }
        if let Ok(v) = env::var("ALIYUN_SMS_SIGN_NAME") {
            config.sms.aliyun_sign_name = v;
        }
        if let Ok(v) = env::var("ALIYUN_SMS_TEMPLATE_CODE") {
            config.sms.aliyun_template_code = v;
        }
        if let Ok(v) = env::var("GENERATION_API_BASE_URL") {
            config.generation.base_url = v;
        }
        if let Ok(v) = env::var("GENERATION_API_KEY") {
            config.generation.api_key = v;
        }
        if let Ok(v) = env::var("GENERATION_DAILY_LIMIT_NORMAL") {
            if let Ok(n) = v.parse() {
                config.generation.daily_limit_normal = n;
            }
        }
        if let Ok(v) = env::var("GENERATION_DAILY_LIMIT_VIP") {
            if let Ok(n) = v.parse() {
                config.generation.daily_limit_vip = n;
            }
        }
        if let Ok(v) = env::var("GENERATION_DAILY_LIMIT_SVIP") {
            if let Ok(n) = v.parse() {
                config.generation.daily_limit_svip = n;
            }
        }

        Ok(config)
    }
}
