pub mod admin;
pub mod class;
pub mod dashboard;
pub mod events;
pub mod export;
pub mod guard;
pub mod import;
pub mod offline;
pub mod student;
pub mod student_portal;
pub mod transaction;
pub mod wali_kelas;

pub use admin::admin_config;
pub use class::class_config;
pub use dashboard::dashboard_config;
pub use events::events_config;
pub use export::export_config;
pub use import::import_config;
pub use offline::offline_config;
pub use student::student_config;
pub use student_portal::student_portal_config;
pub use transaction::transaction_config;
pub use wali_kelas::wali_kelas_config;
