use super::guard::{require_admin, require_admin_tolerant};
use crate::models::*;
use crate::offline::Connectivity;
use crate::services::{ProfileService, TransactionFormService, TransactionService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/admin/transactions",
    tag = "transaksi",
    params(
        ("student_id" = Option<Uuid>, Query, description = "Filter siswa"),
        ("kelas_id" = Option<Uuid>, Query, description = "Filter kelas"),
        ("jenis" = Option<String>, Query, description = "setor atau tarik"),
        ("start_date" = Option<String>, Query, description = "Tanggal awal (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Tanggal akhir (YYYY-MM-DD)"),
        ("page" = Option<u64>, Query, description = "Halaman, mulai 1"),
        ("page_size" = Option<u64>, Query, description = "Jumlah per halaman, maks 200")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Daftar transaksi terbaru lebih dulu (paginated)"),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn list_transactions(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.list_transactions(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Simpan transaksi dari form. Bila database utama tidak terjangkau,
/// transaksi masuk antrian offline dan status `queued` dikembalikan.
#[utoipa::path(
    post,
    path = "/admin/transactions",
    tag = "transaksi",
    request_body = CreateTransactionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaksi tercatat atau masuk antrian offline", body = SubmitTransactionResponse),
        (status = 400, description = "Validasi gagal atau saldo tidak mencukupi", body = ErrorResponse),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn submit_transaction(
    svc: web::Data<TransactionFormService>,
    profiles: web::Data<ProfileService>,
    connectivity: web::Data<Connectivity>,
    req: HttpRequest,
    body: web::Json<CreateTransactionRequest>,
) -> Result<HttpResponse> {
    let admin = match require_admin_tolerant(&req, &profiles, &connectivity).await {
        Ok(label) => label,
        Err(e) => return Ok(e.error_response()),
    };
    match svc.submit(body.into_inner(), &admin).await {
        Ok(result) => {
            let message = result.message.clone();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": result,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/transactions/{id}",
    tag = "transaksi",
    params(("id" = Uuid, Path, description = "ID transaksi")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Data transaksi", body = TransactionResponse),
        (status = 404, description = "Transaksi tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn get_transaction(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.get_transaction(path.into_inner()).await {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/transactions/{id}",
    tag = "transaksi",
    params(("id" = Uuid, Path, description = "ID transaksi")),
    request_body = UpdateTransactionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaksi diperbarui, saldo disesuaikan", body = TransactionResponse),
        (status = 400, description = "Perubahan membuat saldo negatif", body = ErrorResponse)
    )
)]
pub async fn update_transaction(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTransactionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.update_transaction(path.into_inner(), body.into_inner()).await {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx,
            "message": "Transaksi berhasil diperbarui"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/transactions/{id}",
    tag = "transaksi",
    params(("id" = Uuid, Path, description = "ID transaksi")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transaksi dihapus, saldo baru dikembalikan"),
        (status = 400, description = "Penghapusan membuat saldo negatif", body = ErrorResponse)
    )
)]
pub async fn delete_transaction(
    svc: web::Data<TransactionService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.delete_transaction(path.into_inner()).await {
        Ok(saldo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "saldo": saldo },
            "message": "Transaksi berhasil dihapus"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn transaction_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/transactions")
            .route("", web::get().to(list_transactions))
            .route("", web::post().to(submit_transaction))
            .route("/{id}", web::get().to(get_transaction))
            .route("/{id}", web::put().to(update_transaction))
            .route("/{id}", web::delete().to(delete_transaction)),
    );
}
