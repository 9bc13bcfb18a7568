use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportRowError {
    /// nomor baris di file (header = 1)
    pub line: usize,
    pub nis: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub total_rows: usize,
    pub processed_students: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StudentImportReport {
    pub total_rows: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub classes_created: usize,
    pub errors: Vec<ImportRowError>,
}
