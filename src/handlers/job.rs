use crate::models::*;
use crate::services::JobService;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, ResponseError, Result};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "任务已创建"),
        (status = 403, description = "今日配额已用完"),
        (status = 404, description = "角色不存在或没有照片"),
        (status = 502, description = "生成服务不可用")
    )
)]
pub async fn create_job(
    job_service: web::Data<JobService>,
    req: HttpRequest,
    request: web::Json<CreateJobRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match job_service.create_job(user_id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    params(
        ("page" = Option<i64>, Query, description = "页码"),
        ("page_size" = Option<i64>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "任务历史")
    )
)]
pub async fn list_jobs(
    job_service: web::Data<JobService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match job_service.list_jobs(user_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/jobs/quota",
    tag = "jobs",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "配额概览", body = QuotaResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_quota(job_service: web::Data<JobService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match job_service.quota(user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "提供方任务ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "任务状态 (提供方不可达时返回本地最后已知状态)"),
        (status = 404, description = "任务不存在")
    )
)]
pub async fn get_job(
    job_service: web::Data<JobService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let job_id = path.into_inner();

    match job_service.get_job(user_id, &job_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "提供方任务ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已取消 (本地记录置 FAILED)"),
        (status = 502, description = "生成服务不可达")
    )
)]
pub async fn cancel_job(
    job_service: web::Data<JobService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let job_id = path.into_inner();

    match job_service.cancel_job(user_id, &job_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn job_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route("", web::post().to(create_job))
            .route("", web::get().to(list_jobs))
            .route("/quota", web::get().to(get_quota))
            .route("/{job_id}", web::get().to(get_job))
            .route("/{job_id}", web::delete().to(cancel_job)),
    );
}
