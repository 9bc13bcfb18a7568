use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{PendingStatus, Role, TransactionKind};
use crate::handlers;
use crate::models::*;
use crate::services::SyncReport;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::class::list_classes,
        handlers::class::create_class,
        handlers::class::update_class,
        handlers::class::delete_class,
        handlers::student::list_students,
        handlers::student::create_student,
        handlers::student::get_student,
        handlers::student::update_student,
        handlers::student::delete_student,
        handlers::student::student_transactions,
        handlers::student::recalculate_balance,
        handlers::student::passbook,
        handlers::transaction::list_transactions,
        handlers::transaction::submit_transaction,
        handlers::transaction::get_transaction,
        handlers::transaction::update_transaction,
        handlers::transaction::delete_transaction,
        handlers::import::import_transactions,
        handlers::import::import_students,
        handlers::import::download_template,
        handlers::export::export_transactions,
        handlers::export::export_students,
        handlers::export::download_backup,
        handlers::export::restore_backup,
        handlers::dashboard::dashboard_stats,
        handlers::dashboard::range_report,
        handlers::dashboard::daily_summary,
        handlers::dashboard::send_daily_report,
        handlers::offline::offline_status,
        handlers::offline::sync_now,
        handlers::offline::purge_abandoned,
        handlers::offline::remove_pending,
        handlers::student_portal::create_session,
        handlers::student_portal::logout,
        handlers::student_portal::me,
        handlers::student_portal::my_transactions,
        handlers::student_portal::verify_passbook,
        handlers::wali_kelas::roster,
        handlers::wali_kelas::my_roster,
        handlers::wali_kelas::list_assignments,
        handlers::wali_kelas::assign,
        handlers::wali_kelas::remove_assignment,
        handlers::admin::get_school,
        handlers::admin::update_school,
        handlers::admin::list_profiles,
        handlers::admin::upsert_profile,
        handlers::admin::my_profile,
        handlers::events::change_events,
    ),
    components(
        schemas(
            TransactionKind,
            PendingStatus,
            Role,
            ApiError,
            ErrorResponse,
            CreateClassRequest,
            UpdateClassRequest,
            ClassResponse,
            ClassDeleteSummary,
            CreateStudentRequest,
            UpdateStudentRequest,
            StudentResponse,
            CreateTransactionRequest,
            UpdateTransactionRequest,
            TransactionResponse,
            SubmitStatus,
            SubmitTransactionResponse,
            RecalculateResponse,
            ImportRowError,
            ImportReport,
            StudentImportReport,
            RestoreSummary,
            MonthlyChartPoint,
            DashboardStats,
            ReportTotals,
            ReportResponse,
            DailySummary,
            DailyReportResult,
            PendingTransactionResponse,
            OfflineStatusResponse,
            SyncReport,
            CreateSessionRequest,
            StudentInfo,
            StudentSessionResponse,
            PassbookVerification,
            PassbookData,
            SchoolDataResponse,
            UpdateSchoolDataRequest,
            AssignWaliKelasRequest,
            WaliKelasResponse,
            WaliKelasRoster,
            UpsertProfileRequest,
            ProfileResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "kelas", description = "Data kelas"),
        (name = "siswa", description = "Data siswa"),
        (name = "transaksi", description = "Setoran dan penarikan"),
        (name = "import", description = "Import CSV"),
        (name = "export", description = "Export CSV, backup dan restore"),
        (name = "laporan", description = "Dashboard dan laporan"),
        (name = "offline", description = "Antrian offline dan sinkronisasi"),
        (name = "siswa-portal", description = "Akses siswa dengan NIS"),
        (name = "wali-kelas", description = "Wali kelas"),
        (name = "admin", description = "Pengaturan sekolah dan profil staf"),
    ),
    info(
        title = "Tabungan Siswa API",
        version = "1.0.0",
        description = "REST API tabungan siswa"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
