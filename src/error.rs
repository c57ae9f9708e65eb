use crate::models::AccountConflictInfo;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Account conflict: {}", .0.message)]
    Conflict(Box<AccountConflictInfo>),

    #[error("Daily limit reached ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Cache error: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // 配额与冲突错误额外携带结构化数据, 客户端据此渲染可操作的提示
        let (status_code, error_code, message, data) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::InvalidCredential(msg) => {
                log::warn!("Invalid credential: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIAL",
                    msg.clone(),
                    None,
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::RateLimited(msg) => (
                actix_web::http::StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                msg.clone(),
                None,
            ),
            AppError::Conflict(info) => (
                actix_web::http::StatusCode::CONFLICT,
                "ACCOUNT_CONFLICT",
                info.message.clone(),
                serde_json::to_value(info.as_ref()).ok(),
            ),
            AppError::QuotaExceeded { used, limit } => (
                actix_web::http::StatusCode::FORBIDDEN,
                "QUOTA_EXCEEDED",
                format!("Daily limit reached ({used}/{limit})"),
                Some(json!({ "used": used, "limit": limit })),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden".to_string(),
                    None,
                )
            }
            AppError::DeliveryFailed(msg) => {
                log::error!("Delivery failed: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "DELIVERY_FAILED",
                    msg.clone(),
                    None,
                )
            }
            AppError::UpstreamUnavailable(msg) => {
                log::error!("Upstream unavailable: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::ReqwestError(err) => {
                log::error!("HTTP request error: {err}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "Upstream request failed".to_string(),
                    None,
                )
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    "Invalid token".to_string(),
                    None,
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::CacheError(err) => {
                log::error!("Cache error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "CACHE_ERROR",
                    "Cache error".to_string(),
                    None,
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut error_body = json!({
            "code": error_code,
            "message": message
        });
        if let Some(data) = data {
            error_body["data"] = data;
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error_body
        }))
    }
}
