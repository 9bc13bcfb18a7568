use super::guard::{current_user, require_admin};
use crate::error::AppError;
use crate::models::*;
use crate::services::{ProfileService, SchoolService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/school",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Data sekolah", body = SchoolDataResponse))
)]
pub async fn get_school(
    svc: web::Data<SchoolService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.get().await {
        Ok(school) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": school
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/school",
    tag = "admin",
    request_body = UpdateSchoolDataRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Data sekolah disimpan", body = SchoolDataResponse),
        (status = 400, description = "Validasi gagal", body = ErrorResponse)
    )
)]
pub async fn update_school(
    svc: web::Data<SchoolService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<UpdateSchoolDataRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.update(body.into_inner()).await {
        Ok(school) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": school,
            "message": "Data sekolah berhasil disimpan"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/profiles",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Daftar profil staf", body = [ProfileResponse]))
)]
pub async fn list_profiles(
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match profiles.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/profiles",
    tag = "admin",
    request_body = UpsertProfileRequest,
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Profil disimpan", body = ProfileResponse))
)]
pub async fn upsert_profile(
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<UpsertProfileRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match profiles.upsert(body.into_inner()).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile,
            "message": "Profil berhasil disimpan"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profil user saat ini", body = ProfileResponse),
        (status = 404, description = "User belum punya profil", body = ErrorResponse)
    )
)]
pub async fn my_profile(
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    match profiles.get(user.user_id).await {
        Ok(Some(profile)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ProfileResponse::from(profile)
        }))),
        Ok(None) => Ok(AppError::NotFound("Profil belum dibuat".into()).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/me", web::get().to(my_profile))
        .service(
            web::scope("/admin/school")
                .route("", web::get().to(get_school))
                .route("", web::put().to(update_school)),
        )
        .service(
            web::scope("/admin/profiles")
                .route("", web::get().to(list_profiles))
                .route("", web::post().to(upsert_profile)),
        );
}
