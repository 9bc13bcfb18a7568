pub mod admin;
pub mod backup;
pub mod class;
pub mod common;
pub mod dashboard;
pub mod import;
pub mod offline;
pub mod pagination;
pub mod student;
pub mod student_portal;
pub mod transaction;

pub use admin::*;
pub use backup::*;
pub use class::*;
pub use common::*;
pub use dashboard::*;
pub use import::*;
pub use offline::*;
pub use pagination::*;
pub use student::*;
pub use student_portal::*;
pub use transaction::*;
