use super::guard::{require_admin, staff_label};
use crate::error::AppError;
use crate::services::import_service::{STUDENT_TEMPLATE, TRANSACTION_TEMPLATE};
use crate::services::{ImportService, ProfileService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/import/transactions",
    tag = "import",
    request_body(content = String, content_type = "text/csv", description = "CSV NIS,Jenis,Tanggal,Jumlah,Keterangan"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Hasil import; baris duplikat dilewati", body = ImportReport),
        (status = 400, description = "Kolom wajib tidak ada", body = ErrorResponse)
    )
)]
pub async fn import_transactions(
    svc: web::Data<ImportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: String,
) -> Result<HttpResponse> {
    let admin = match require_admin(&req, &profiles).await {
        Ok(p) => staff_label(&p),
        Err(e) => return Ok(e.error_response()),
    };
    match svc.import_transactions(&body, &admin).await {
        Ok(report) => {
            let message = format!(
                "{} transaksi diimport, {} duplikat dilewati, {} baris gagal",
                report.inserted,
                report.skipped_duplicates,
                report.errors.len()
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
    path = "/admin/import/students",
    tag = "import",
    request_body(content = String, content_type = "text/csv", description = "CSV NIS,Nama,Kelas"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Hasil import siswa", body = StudentImportReport),
        (status = 400, description = "Kolom wajib tidak ada", body = ErrorResponse)
    )
)]
pub async fn import_students(
    svc: web::Data<ImportService>,
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    body: String,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match svc.import_students(&body).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/import/templates/{kind}",
    tag = "import",
    params(("kind" = String, Path, description = "transactions atau students")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Template CSV", content_type = "text/csv"),
        (status = 404, description = "Template tidak dikenal", body = ErrorResponse)
    )
)]
pub async fn download_template(
    profiles: web::Data<ProfileService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req, &profiles).await {
        return Ok(e.error_response());
    }
    match path.as_str() {
        "transactions" => Ok(csv_response(
            "template_import_transaksi.csv",
            TRANSACTION_TEMPLATE.to_string(),
        )),
        "students" => Ok(csv_response(
            "template_import_siswa.csv",
            STUDENT_TEMPLATE.to_string(),
        )),
        _ => Ok(AppError::NotFound("Template tidak dikenal".into()).error_response()),
    }
}

pub(crate) fn csv_response(filename: &str, content: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(content)
}

pub fn import_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/import")
            .route("/transactions", web::post().to(import_transactions))
            .route("/students", web::post().to(import_students))
            .route("/templates/{kind}", web::get().to(download_template)),
    );
}
