use super::guard::require_admin;
use crate::models::*;
use crate::services::{DashboardService, ProfileService, ReportService};
use crate::utils::validation::today;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "laporan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Statistik ringkas dan grafik enam bulan", body = DashboardStats),
        (status = 403, description = "Bukan admin", body = ErrorResponse)
    )
)]
pub async fn dashboard_stats(
    svc: web::Data<DashboardService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.stats(today()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/reports",
    tag = "laporan",
    params(
        ("start_date" = String, Query, description = "Tanggal awal (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "Tanggal akhir (YYYY-MM-DD)"),
        ("kelas_id" = Option<Uuid>, Query, description = "Filter kelas")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Laporan rentang tanggal", body = ReportResponse),
        (status = 400, description = "Rentang tanggal tidak valid", body = ErrorResponse)
    )
)]
pub async fn range_report(
    svc: web::Data<DashboardService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.report(&query).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/reports/daily",
    tag = "laporan",
    params(("tanggal" = Option<String>, Query, description = "Tanggal (YYYY-MM-DD), default hari ini")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Ringkasan harian", body = DailySummary))
)]
pub async fn daily_summary(
    svc: web::Data<ReportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<DailyReportQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.daily_summary(query.tanggal.unwrap_or_else(today)).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/reports/daily/send",
    tag = "laporan",
    params(("tanggal" = Option<String>, Query, description = "Tanggal (YYYY-MM-DD), default hari ini")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Laporan dikirim ke nomor WhatsApp tujuan", body = DailyReportResult),
        (status = 500, description = "Gateway belum dikonfigurasi", body = ErrorResponse)
    )
)]
pub async fn send_daily_report(
    svc: web::Data<ReportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    query: web::Query<DailyReportQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc
        .send_daily_report(query.tanggal.unwrap_or_else(today))
        .await
    {
        Ok(result) => {
            let message = format!("Laporan terkirim ke {} nomor", result.sent_to.len());
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": result,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/dashboard", web::get().to(dashboard_stats))
        .service(
            web::scope("/admin/reports")
                .route("", web::get().to(range_report))
                .route("/daily", web::get().to(daily_summary))
                .route("/daily/send", web::post().to(send_daily_report)),
        );
}
