use super::guard::{current_user, require_admin, require_role};
use crate::entities::Role;
use crate::error::AppError;
use crate::models::*;
use crate::services::{ProfileService, WaliKelasService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/wali-kelas/{user_id}/students",
    tag = "wali-kelas",
    params(("user_id" = Uuid, Path, description = "ID user wali kelas")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Siswa di kelas yang diampu", body = WaliKelasRoster),
        (status = 403, description = "Bukan wali kelas tersebut", body = ErrorResponse)
    )
)]
pub async fn roster(
    svc: web::Data<WaliKelasService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let profile = match require_role(&req, &profiles, &[Role::Admin, Role::WaliKelas]).await {
        Ok(p) => p,
        Err(e) => return Ok(e.error_response()),
    };
    // wali kelas hanya boleh melihat kelasnya sendiri
    if profile.role != Role::Admin && profile.id != user_id {
        return Ok(AppError::Forbidden.error_response());
    }
    match svc.roster(user_id).await {
        Ok(roster) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": roster
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wali-kelas/me/students",
    tag = "wali-kelas",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Siswa di kelas user saat ini", body = WaliKelasRoster))
)]
pub async fn my_roster(
    svc: web::Data<WaliKelasService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    match svc.roster(user.user_id).await {
        Ok(roster) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": roster
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/wali-kelas",
    tag = "wali-kelas",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Daftar penugasan wali kelas", body = [WaliKelasResponse]))
)]
pub async fn list_assignments(
    svc: web::Data<WaliKelasService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/wali-kelas",
    tag = "wali-kelas",
    request_body = AssignWaliKelasRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Wali kelas ditugaskan", body = WaliKelasResponse),
        (status = 404, description = "Kelas tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn assign(
    svc: web::Data<WaliKelasService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<AssignWaliKelasRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.assign(body.into_inner()).await {
        Ok(assignment) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": assignment,
            "message": "Wali kelas berhasil ditugaskan"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/wali-kelas/{id}",
    tag = "wali-kelas",
    params(("id" = Uuid, Path, description = "ID penugasan")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Penugasan dihapus"),
        (status = 404, description = "Tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn remove_assignment(
    svc: web::Data<WaliKelasService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.remove(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Wali kelas berhasil dihapus"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wali_kelas_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wali-kelas")
            .route("/me/students", web::get().to(my_roster))
            .route("/{user_id}/students", web::get().to(roster)),
    )
    .service(
        web::scope("/admin/wali-kelas")
            .route("", web::get().to(list_assignments))
            .route("", web::post().to(assign))
            .route("/{id}", web::delete().to(remove_assignment)),
    );
}
