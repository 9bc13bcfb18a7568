use super::guard::require_admin_tolerant;
use crate::error::AppError;
use crate::models::*;
use crate::offline::{Connectivity, OfflineQueue};
use crate::services::{ProfileService, SyncService, SyncTrigger};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

// Antrian ada di SQLite lokal, jadi endpoint ini tetap jalan saat database
// utama mati. Saat itu peran admin diambil dari token.

#[utoipa::path(
    get,
    path = "/admin/offline/status",
    tag = "offline",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status koneksi dan isi antrian", body = OfflineStatusResponse),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn offline_status(
    queue: web::Data<OfflineQueue>,
    connectivity: web::Data<Connectivity>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin_tolerant(&req, &profiles, &connectivity).await {
        return Ok(e.error_response());
    }
    let items = match queue.get_pending_transactions().await {
        Ok(items) => items,
        Err(e) => return Ok(e.error_response()),
    };
    let status = OfflineStatusResponse {
        online: connectivity.is_online(),
        pending_count: items.len() as u64,
        items: items.into_iter().map(Into::into).collect(),
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": status
    })))
}

#[utoipa::path(
    post,
    path = "/admin/offline/sync",
    tag = "offline",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Hasil sinkronisasi manual", body = SyncReport),
        (status = 403, description = "Bukan admin", body = ErrorResponse),
        (status = 503, description = "Database utama tidak terjangkau", body = ErrorResponse)
    )
)]
pub async fn sync_now(
    svc: web::Data<SyncService>,
    connectivity: web::Data<Connectivity>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin_tolerant(&req, &profiles, &connectivity).await {
        return Ok(e.error_response());
    }
    match svc.sync_all_pending(SyncTrigger::Manual).await {
        Ok(report) => {
            let message = format!(
                "{} transaksi tersinkron, {} gagal, {} dilewati",
                report.success, report.failed, report.skipped
            );
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": report,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/offline/purge",
    tag = "offline",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Entri yang melewati batas percobaan dihapus"),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn purge_abandoned(
    svc: web::Data<SyncService>,
    connectivity: web::Data<Connectivity>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin_tolerant(&req, &profiles, &connectivity).await {
        return Ok(e.error_response());
    }
    match svc.queue().purge_abandoned(svc.max_retries()).await {
        Ok(removed) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "removed": removed },
            "message": format!("{removed} transaksi gagal dihapus dari antrian")
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/offline/{id}",
    tag = "offline",
    params(("id" = String, Path, description = "ID offline")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Entri dihapus dari antrian"),
        (status = 403, description = "Bukan admin", body = ErrorResponse),
        (status = 404, description = "Entri tidak ditemukan", body = ErrorResponse)
    )
)]
pub async fn remove_pending(
    queue: web::Data<OfflineQueue>,
    connectivity: web::Data<Connectivity>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin_tolerant(&req, &profiles, &connectivity).await {
        return Ok(e.error_response());
    }
    match queue.remove(&path).await {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Transaksi offline dihapus"
        }))),
        Ok(false) => {
            Ok(AppError::NotFound("Transaksi offline tidak ditemukan".into()).error_response())
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn offline_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/offline")
            .route("/status", web::get().to(offline_status))
            .route("/sync", web::post().to(sync_now))
            .route("/purge", web::post().to(purge_abandoned))
            .route("/{id}", web::delete().to(remove_pending)),
    );
}
