use crate::entities::student_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStudentRequest {
    pub nis: String,
    pub nama: String,
    pub kelas_id: Uuid,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateStudentRequest {
    pub nis: Option<String>,
    pub nama: Option<String>,
    pub kelas_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub kelas_id: Option<Uuid>,
    /// cari di nama atau NIS
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentExportQuery {
    pub kelas_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentResponse {
    pub id: Uuid,
    pub nis: String,
    pub nama: String,
    pub kelas_id: Uuid,
    pub nama_kelas: Option<String>,
    pub saldo: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentResponse {
    pub fn from_model(model: student_entity::Model, nama_kelas: Option<String>) -> Self {
        Self {
            id: model.id,
            nis: model.nis,
            nama: model.nama,
            kelas_id: model.kelas_id,
            nama_kelas,
            saldo: model.saldo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
