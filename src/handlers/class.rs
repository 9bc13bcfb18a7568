use super::guard::require_admin;
use crate::models::*;
use crate::services::{ClassService, ProfileService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/admin/classes",
    tag = "kelas",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Daftar kelas beserta jumlah siswa dan saldo", body = [ClassResponse]),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn list_classes(
    svc: web::Data<ClassService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.list_classes().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/classes",
    tag = "kelas",
    request_body = CreateClassRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Kelas dibuat", body = ClassResponse),
        (status = 409, description = "Nama kelas sudah ada", body = ErrorResponse)
    )
)]
pub async fn create_class(
    svc: web::Data<ClassService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<CreateClassRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.create_class(body.into_inner()).await {
        Ok(class) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": class,
            "message": "Kelas berhasil ditambahkan"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/classes/{id}",
    tag = "kelas",
    params(("id" = Uuid, Path, description = "ID kelas")),
    request_body = UpdateClassRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Kelas diperbarui", body = ClassResponse),
        (status = 404, description = "Kelas tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn update_class(
    svc: web::Data<ClassService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateClassRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.update_class(path.into_inner(), body.into_inner()).await {
        Ok(class) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": class,
            "message": "Kelas berhasil diperbarui"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/classes/{id}",
    tag = "kelas",
    params(("id" = Uuid, Path, description = "ID kelas")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Kelas beserta siswa dan transaksinya dihapus", body = ClassDeleteSummary),
        (status = 404, description = "Kelas tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn delete_class(
    svc: web::Data<ClassService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.delete_class(path.into_inner()).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary,
            "message": "Kelas berhasil dihapus"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn class_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/classes")
            .route("", web::get().to(list_classes))
            .route("", web::post().to(create_class))
            .route("/{id}", web::put().to(update_class))
            .route("/{id}", web::delete().to(delete_class)),
    );
}
