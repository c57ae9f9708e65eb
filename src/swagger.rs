use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{GenerationStatus, VipLevel};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::wechat_login,
        handlers::auth::send_code,
        handlers::auth::phone_login,
        handlers::auth::bind_phone,
        handlers::auth::phone_conflict,
        handlers::auth::bind_wechat,
        handlers::auth::refresh_token,
        handlers::auth::userinfo,
        handlers::auth::check,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::job::create_job,
        handlers::job::list_jobs,
        handlers::job::get_quota,
        handlers::job::get_job,
        handlers::job::cancel_job,
        handlers::character::create_character,
        handlers::character::list_characters,
        handlers::character::get_character_photos,
        handlers::character::add_character_photo,
    ),
    components(
        schemas(
            WechatLoginRequest,
            WechatUserInfo,
            SendCodeRequest,
            SendCodeResponse,
            PhoneLoginRequest,
            BindPhoneRequest,
            AuthResponse,
            AccountConflictInfo,
            ConflictAccount,
            UserResponse,
            UpdateUserRequest,
            UserStatistics,
            CreateJobRequest,
            GenerationResponse,
            QuotaResponse,
            CreateCharacterRequest,
            AddPhotoRequest,
            CharacterResponse,
            CharacterPhotoResponse,
            VipLevel,
            GenerationStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "登录、验证码与账号绑定"),
        (name = "user", description = "用户资料"),
        (name = "jobs", description = "AI 图片生成任务与配额"),
        (name = "characters", description = "角色与锁脸参考照片")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
