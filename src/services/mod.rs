pub mod class_service;
pub mod dashboard_service;
pub mod export_service;
pub mod import_service;
pub mod profile_service;
pub mod report_service;
pub mod school_service;
pub mod student_portal_service;
pub mod student_service;
pub mod sync_service;
pub mod transaction_form_service;
pub mod transaction_service;
pub mod wali_kelas_service;

pub use class_service::ClassService;
pub use dashboard_service::DashboardService;
pub use export_service::ExportService;
pub use import_service::ImportService;
pub use profile_service::ProfileService;
pub use report_service::ReportService;
pub use school_service::SchoolService;
pub use student_portal_service::StudentPortalService;
pub use student_service::StudentService;
pub use sync_service::{SyncReport, SyncService, SyncTrigger};
pub use transaction_form_service::TransactionFormService;
pub use transaction_service::TransactionService;
pub use wali_kelas_service::WaliKelasService;
