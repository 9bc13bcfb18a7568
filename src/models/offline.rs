use crate::entities::{PendingStatus, TransactionKind, pending_transaction_entity as pending};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingTransactionResponse {
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

impl From<pending::Model> for PendingTransactionResponse {
    fn from(m: pending::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            jenis: m.jenis,
            jumlah: m.jumlah,
            tanggal: m.tanggal,
            keterangan: m.keterangan,
            admin: m.admin,
            created_at: m.created_at,
            status: m.status,
            retry_count: m.retry_count,
            last_error: m.last_error,
            next_attempt_at: m.next_attempt_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfflineStatusResponse {
    pub online: bool,
    pub pending_count: u64,
    pub items: Vec<PendingTransactionResponse>,
}
