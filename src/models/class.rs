use crate::entities::class_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClassRequest {
    pub nama_kelas: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClassRequest {
    pub nama_kelas: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: Uuid,
    pub nama_kelas: String,
    pub jumlah_siswa: u64,
    pub total_saldo: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassResponse {
    pub fn from_model(model: class_entity::Model, jumlah_siswa: u64, total_saldo: i64) -> Self {
        Self {
            id: model.id,
            nama_kelas: model.nama_kelas,
            jumlah_siswa,
            total_saldo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Ringkasan hapus kelas beserta data turunannya.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ClassDeleteSummary {
    pub students: u64,
    pub transactions: u64,
    pub wali_kelas: u64,
}
