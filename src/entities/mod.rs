pub mod classes;
pub mod pending_transactions;
pub mod profiles;
pub mod school_data;
pub mod student_sessions;
pub mod students;
pub mod transactions;
pub mod wali_kelas;

pub use classes as class_entity;
pub use pending_transactions as pending_transaction_entity;
pub use profiles as profile_entity;
pub use school_data as school_data_entity;
pub use student_sessions as student_session_entity;
pub use students as student_entity;
pub use transactions as transaction_entity;
pub use wali_kelas as wali_kelas_entity;

pub use pending_transactions::PendingStatus;
pub use profiles::Role;
pub use transactions::TransactionKind;
