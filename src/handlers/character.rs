use crate::models::*;
use crate::services::CharacterService;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/characters",
    tag = "characters",
    request_body = CreateCharacterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "角色已创建", body = CharacterResponse)
    )
)]
pub async fn create_character(
    character_service: web::Data<CharacterService>,
    req: HttpRequest,
    request: web::Json<CreateCharacterRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match character_service
        .create_character(user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/characters",
    tag = "characters",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "角色列表")
    )
)]
pub async fn list_characters(
    character_service: web::Data<CharacterService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match character_service.list_characters(user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/characters/{uuid}/photos",
    tag = "characters",
    params(
        ("uuid" = String, Path, description = "角色UUID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "角色照片列表"),
        (status = 403, description = "角色属于其他用户"),
        (status = 404, description = "角色不存在")
    )
)]
pub async fn get_character_photos(
    character_service: web::Data<CharacterService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let uuid = path.into_inner();

    match character_service.get_character_photos(user_id, &uuid).await {
        Ok(photos) => {
            let photos: Vec<CharacterPhotoResponse> =
                photos.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": photos
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/characters/{uuid}/photos",
    tag = "characters",
    request_body = AddPhotoRequest,
    params(
        ("uuid" = String, Path, description = "角色UUID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "照片已添加", body = CharacterPhotoResponse),
        (status = 400, description = "已达到照片数量上限"),
        (status = 403, description = "角色属于其他用户")
    )
)]
pub async fn add_character_photo(
    character_service: web::Data<CharacterService>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<AddPhotoRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let uuid = path.into_inner();

    match character_service
        .add_photo(user_id, &uuid, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn character_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/characters")
            .route("", web::post().to(create_character))
            .route("", web::get().to(list_characters))
            .route("/{uuid}/photos", web::get().to(get_character_photos))
            .route("/{uuid}/photos", web::post().to(add_character_photo)),
    );
}
