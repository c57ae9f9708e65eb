use crate::models::*;
use crate::services::{AuthService, SmsService, UserService};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/auth/wechat-login",
    tag = "auth",
    request_body = WechatLoginRequest,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "登录凭据无效")
    )
)]
pub async fn wechat_login(
    auth_service: web::Data<AuthService>,
    request: web::Json<WechatLoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.wechat_login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/send-code",
    tag = "auth",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "验证码已发送"),
        (status = 429, description = "发送过于频繁"),
        (status = 502, description = "短信网关投递失败")
    )
)]
pub async fn send_code(
    sms_service: web::Data<SmsService>,
    request: web::Json<SendCodeRequest>,
) -> Result<HttpResponse> {
    match sms_service.send_verification_code(&request.phone).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "Verification code sent"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/phone-login",
    tag = "auth",
    request_body = PhoneLoginRequest,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "验证码无效或已过期")
    )
)]
pub async fn phone_login(
    auth_service: web::Data<AuthService>,
    request: web::Json<PhoneLoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.phone_login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/bind-phone",
    tag = "auth",
    request_body = BindPhoneRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "绑定成功", body = UserResponse),
        (status = 409, description = "手机号已属于其他账号且未同意合并"),
        (status = 401, description = "验证码无效或已过期")
    )
)]
pub async fn bind_phone(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<BindPhoneRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match auth_service.bind_phone(user_id, request.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "user": user }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct PhoneConflictQuery {
    pub phone: String,
}

#[utoipa::path(
    get,
    path = "/auth/phone-conflict",
    tag = "auth",
    params(PhoneConflictQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "冲突检测结果 (data 为 null 表示无冲突)")
    )
)]
pub async fn phone_conflict(
    auth_service: web::Data<AuthService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<PhoneConflictQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    let user = match user_service.find_by_id(user_id).await {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match auth_service
        .check_phone_conflict(&query.phone, user.openid.as_deref())
        .await
    {
        Ok(conflict) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": conflict
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/bind-wechat",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 400, description = "暂不支持")
    )
)]
pub async fn bind_wechat(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match auth_service.bind_wechat(user_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "刷新令牌成功", body = AuthResponse),
        (status = 401, description = "无效的令牌")
    )
)]
pub async fn refresh_token(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let auth_header = req.headers().get("Authorization");

    let token = match auth_header
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return Ok(HttpResponse::Unauthorized().json(json!({
                "success": false,
                "error": {
                    "code": "MISSING_TOKEN",
                    "message": "Missing bearer token"
                }
            })));
        }
    };

    match auth_service.refresh_token(token).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auth/userinfo",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前用户信息", body = UserResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn userinfo(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match user_service.get_user_profile(user_id).await {
        Ok((user, stats)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "user": user,
                "stats": stats
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auth/check",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "登录状态有效"),
        (status = 401, description = "未授权")
    )
)]
pub async fn check(user_service: web::Data<UserService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match user_service.find_by_id(user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "valid": true,
                "user": UserResponse::from(user)
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/wechat-login", web::post().to(wechat_login))
            .route("/send-code", web::post().to(send_code))
            .route("/phone-login", web::post().to(phone_login))
            .route("/bind-phone", web::post().to(bind_phone))
            .route("/phone-conflict", web::get().to(phone_conflict))
            .route("/bind-wechat", web::post().to(bind_wechat))
            .route("/refresh-token", web::post().to(refresh_token))
            .route("/userinfo", web::get().to(userinfo))
            .route("/check", web::get().to(check)),
    );
}
