use super::guard::require_admin;
use super::import::csv_response;
use crate::models::*;
use crate::services::{ExportService, ProfileService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/export/transactions",
    tag = "export",
    params(
        ("student_id" = Option<Uuid>, Query, description = "Filter siswa"),
        ("kelas_id" = Option<Uuid>, Query, description = "Filter kelas"),
        ("jenis" = Option<String>, Query, description = "setor atau tarik"),
        ("start_date" = Option<String>, Query, description = "Tanggal awal (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Tanggal akhir (YYYY-MM-DD)")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "CSV transaksi", content_type = "text/csv"))
)]
pub async fn export_transactions(
    svc: web::Data<ExportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.transactions_csv(&query).await {
        Ok(csv) => Ok(csv_response("transaksi.csv", csv)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/export/students",
    tag = "export",
    params(("kelas_id" = Option<Uuid>, Query, description = "Filter kelas")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "CSV siswa dan saldo", content_type = "text/csv"))
)]
pub async fn export_students(
    svc: web::Data<ExportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<StudentExportQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.students_csv(query.kelas_id).await {
        Ok(csv) => Ok(csv_response("siswa.csv", csv)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/backup",
    tag = "export",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "File backup JSON seluruh data", content_type = "application/json"))
)]
pub async fn download_backup(
    svc: web::Data<ExportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.backup().await {
        Ok(file) => {
            let filename = format!("backup_tabungan_{}.json", file.timestamp.format("%Y%m%d_%H%M%S"));
            Ok(HttpResponse::Ok()
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{filename}\""),
                ))
                .json(file))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/backup/restore",
    tag = "export",
    request_body(content = String, content_type = "application/json", description = "Isi file backup"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Seluruh data diganti dengan isi backup", body = RestoreSummary),
        (status = 400, description = "File backup tidak valid", body = ErrorResponse)
    )
)]
pub async fn restore_backup(
    svc: web::Data<ExportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: web::Json<BackupFile>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.restore(body.into_inner()).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary,
            "message": "Data berhasil dipulihkan dari backup"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn export_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/export")
            .route("/transactions", web::get().to(export_transactions))
            .route("/students", web::get().to(export_students)),
    )
    .service(
        web::scope("/admin/backup")
            .route("", web::get().to(download_backup))
            .route("/restore", web::post().to(restore_backup)),
    );
}
