use super::guard::require_admin;
use crate::models::*;
use crate::services::{ExportService, ProfileService, StudentService, TransactionService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/admin/students",
    tag = "siswa",
    params(
        ("kelas_id" = Option<Uuid>, Query, description = "Filter kelas"),
        ("search" = Option<String>, Query, description = "Cari nama atau NIS"),
        ("page" = Option<u64>, Query, description = "Halaman, mulai 1"),
        ("page_size" = Option<u64>, Query, description = "Jumlah per halaman, maks 200")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Daftar siswa (paginated)"),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn list_students(
    svc: web::Data<StudentService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.list_students(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/students",
    tag = "siswa",
    request_body = CreateStudentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Siswa dibuat", body = StudentResponse),
        (status = 409, description = "NIS sudah terdaftar", body = ErrorResponse)
    )
)]
pub async fn create_student(
    svc: web::Data<StudentService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<CreateStudentRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.create_student(body.into_inner()).await {
        Ok(student) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": student,
            "message": "Siswa berhasil ditambahkan"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/students/{id}",
    tag = "siswa",
    params(("id" = Uuid, Path, description = "ID siswa")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Data siswa", body = StudentResponse),
        (status = 404, description = "Siswa tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn get_student(
    svc: web::Data<StudentService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.get_student(path.into_inner()).await {
        Ok(student) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": student
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/students/{id}",
    tag = "siswa",
    params(("id" = Uuid, Path, description = "ID siswa")),
    request_body = UpdateStudentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Siswa diperbarui", body = StudentResponse),
        (status = 404, description = "Siswa tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn update_student(
    svc: web::Data<StudentService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStudentRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.update_student(path.into_inner(), body.into_inner()).await {
        Ok(student) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": student,
            "message": "Data siswa berhasil diperbarui"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/students/{id}",
    tag = "siswa",
    params(("id" = Uuid, Path, description = "ID siswa")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Siswa dan riwayat transaksinya dihapus"),
        (status = 404, description = "Siswa tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn delete_student(
    svc: web::Data<StudentService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.delete_student(path.into_inner()).await {
        Ok(deleted_transactions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "deleted_transactions": deleted_transactions },
            "message": "Siswa berhasil dihapus"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/students/{id}/transactions",
    tag = "siswa",
    params(
        ("id" = Uuid, Path, description = "ID siswa"),
        ("limit" = Option<u64>, Query, description = "Jumlah transaksi terbaru")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Riwayat transaksi siswa", body = [TransactionResponse])
    )
)]
pub async fn student_transactions(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<StudentTransactionsQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.student_transactions(path.into_inner(), query.limit).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/students/{id}/recalculate",
    tag = "siswa",
    params(("id" = Uuid, Path, description = "ID siswa")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Saldo dihitung ulang dari riwayat", body = RecalculateResponse),
        (status = 404, description = "Siswa tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn recalculate_balance(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.recalculate_student(path.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result,
            "message": "Saldo berhasil dihitung ulang"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/students/{id}/passbook",
    tag = "siswa",
    params(("id" = Uuid, Path, description = "ID siswa")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Data cetak buku tabungan", body = PassbookData),
        (status = 404, description = "Siswa tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn passbook(
    svc: web::Data<ExportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.passbook(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": data
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn student_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/students")
            .route("", web::get().to(list_students))
            .route("", web::post().to(create_student))
            .route("/{id}", web::get().to(get_student))
            .route("/{id}", web::put().to(update_student))
            .route("/{id}", web::delete().to(delete_student))
            .route("/{id}/transactions", web::get().to(student_transactions))
            .route("/{id}/recalculate", web::post().to(recalculate_balance))
            .route("/{id}/passbook", web::get().to(passbook)),
    );
}
