use super::StudentResponse;
use crate::entities::{Role, profile_entity, school_data_entity, wali_kelas_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchoolDataResponse {
    pub nama_sekolah: String,
    pub alamat: Option<String>,
    pub telepon: Option<String>,
    pub email: Option<String>,
    pub kepala_sekolah: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<school_data_entity::Model> for SchoolDataResponse {
    fn from(m: school_data_entity::Model) -> Self {
        Self {
            nama_sekolah: m.nama_sekolah,
            alamat: m.alamat,
            telepon: m.telepon,
            email: m.email,
            kepala_sekolah: m.kepala_sekolah,
            updated_at: Some(m.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSchoolDataRequest {
    pub nama_sekolah: String,
    pub alamat: Option<String>,
    pub telepon: Option<String>,
    pub email: Option<String>,
    pub kepala_sekolah: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignWaliKelasRequest {
    pub user_id: Uuid,
    pub kelas_id: Uuid,
    pub nama: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaliKelasResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kelas_id: Uuid,
    pub nama_kelas: Option<String>,
    pub nama: String,
    pub created_at: DateTime<Utc>,
}

impl WaliKelasResponse {
    pub fn from_model(m: wali_kelas_entity::Model, nama_kelas: Option<String>) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            kelas_id: m.kelas_id,
            nama_kelas,
            nama: m.nama,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WaliKelasRoster {
    pub kelas_id: Uuid,
    pub nama_kelas: String,
    pub wali_kelas: String,
    pub students: Vec<StudentResponse>,
    pub total_saldo: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    pub id: Uuid,
    pub role: Role,
    pub nama: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub role: Role,
    pub nama: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<profile_entity::Model> for ProfileResponse {
    fn from(m: profile_entity::Model) -> Self {
        Self {
            id: m.id,
            role: m.role,
            nama: m.nama,
            email: m.email,
            created_at: m.created_at,
        }
    }
}
