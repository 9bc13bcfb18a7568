use super::transactions::TransactionKind;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "syncing")]
    Syncing,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingStatus::Pending => write!(f, "pending"),
            PendingStatus::Syncing => write!(f, "syncing"),
            PendingStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Disimpan di database offline lokal, bukan di database utama.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pending_transactions")]
pub struct Model {
    /// offline_<timestamp>_<random>
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: Uuid,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: NaiveDate,
    pub keterangan: Option<String>,
    pub admin: String,
    pub created_at: DateTime<Utc>,
    pub status: PendingStatus,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
