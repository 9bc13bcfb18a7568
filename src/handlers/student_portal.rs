use super::guard::{bearer_token, client_key};
use crate::error::AppError;
use crate::models::*;
use crate::services::StudentPortalService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn session_token(req: &HttpRequest) -> Result<String, AppError> {
    bearer_token(req).ok_or_else(|| AppError::AuthError("Sesi tidak valid".into()))
}

#[utoipa::path(
    post,
    path = "/student/session",
    tag = "siswa-portal",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Sesi dibuat", body = StudentSessionResponse),
        (status = 404, description = "NIS tidak ditemukan", body = ErrorResponse),
        (status = 429, description = "Terlalu banyak percobaan", body = ErrorResponse)
    )
)]
pub async fn create_session(
    svc: web::Data<StudentPortalService>,
    req: HttpRequest,
    body: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse> {
    let client = client_key(&req);
    match svc.create_session(&body.nis, &client).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/student/session",
    tag = "siswa-portal",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sesi diakhiri"))
)]
pub async fn logout(svc: web::Data<StudentPortalService>, req: HttpRequest) -> Result<HttpResponse> {
    let token = match session_token(&req) {
        Ok(t) => t,
        Err(e) => return Ok(e.error_response()),
    };
    match svc.logout(&token).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Berhasil keluar"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/student/me",
    tag = "siswa-portal",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Data dan saldo siswa", body = StudentInfo),
        (status = 401, description = "Sesi tidak valid atau berakhir", body = ErrorResponse)
    )
)]
pub async fn me(svc: web::Data<StudentPortalService>, req: HttpRequest) -> Result<HttpResponse> {
    let token = match session_token(&req) {
        Ok(t) => t,
        Err(e) => return Ok(e.error_response()),
    };
    match svc.get_student_info(&token).await {
        Ok(info) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": info
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/student/me/transactions",
    tag = "siswa-portal",
    params(("limit" = Option<u64>, Query, description = "Jumlah transaksi terbaru, default 50")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Riwayat transaksi siswa", body = [TransactionResponse]),
        (status = 401, description = "Sesi tidak valid atau berakhir", body = ErrorResponse)
    )
)]
pub async fn my_transactions(
    svc: web::Data<StudentPortalService>,
    req: HttpRequest,
    query: web::Query<StudentTransactionsQuery>,
) -> Result<HttpResponse> {
    let token = match session_token(&req) {
        Ok(t) => t,
        Err(e) => return Ok(e.error_response()),
    };
    match svc.get_student_transactions(&token, query.limit).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/passbook/verify/{nis}",
    tag = "siswa-portal",
    params(("nis" = String, Path, description = "NIS dari QR buku tabungan")),
    responses(
        (status = 200, description = "Buku tabungan terdaftar", body = PassbookVerification),
        (status = 404, description = "Tidak terdaftar", body = ErrorResponse)
    )
)]
pub async fn verify_passbook(
    svc: web::Data<StudentPortalService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let client = client_key(&req);
    match svc.verify_passbook(&path, &client).await {
        Ok(v) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": v
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn student_portal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/student")
            .route("/session", web::post().to(create_session))
            .route("/session", web::delete().to(logout))
            .route("/me", web::get().to(me))
            .route("/me/transactions", web::get().to(my_transactions)),
    )
    .route("/passbook/verify/{nis}", web::get().to(verify_passbook));
}
