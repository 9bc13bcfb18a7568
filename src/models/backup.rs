use crate::entities::{class_entity, school_data_entity, student_entity, transaction_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const BACKUP_VERSION: &str = "1.0";

/// Isi file backup JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub school_data: Vec<school_data_entity::Model>,
    #[serde(default)]
    pub classes: Vec<class_entity::Model>,
    #[serde(default)]
    pub students: Vec<student_entity::Model>,
    #[serde(default)]
    pub transactions: Vec<transaction_entity::Model>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RestoreSummary {
    pub school_data: usize,
    pub classes: usize,
    pub students: usize,
    pub transactions: usize,
    /// Penugasan wali kelas yang dipertahankan karena kelasnya ada di backup.
    pub wali_kelas_kept: usize,
    pub wali_kelas_dropped: usize,
}
