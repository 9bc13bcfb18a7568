use crate::entities::{TransactionKind, transaction_entity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Isian form transaksi. `tanggal` berupa teks agar format
/// `YYYY-MM-DD` dan `DD/MM/YYYY` sama-sama diterima.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub student_id: Uuid,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: String,
    pub keterangan: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTransactionRequest {
    pub jenis: Option<TransactionKind>,
    pub jumlah: Option<i64>,
    pub tanggal: Option<String>,
    pub keterangan: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub student_id: Option<Uuid>,
    pub kelas_id: Option<Uuid>,
    pub jenis: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub nis: Option<String>,
    pub nama_siswa: Option<String>,
    pub nama_kelas: Option<String>,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: NaiveDate,
    pub saldo_setelah: i64,
    pub keterangan: Option<String>,
    pub admin: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionResponse {
    pub fn from_model(
        model: transaction_entity::Model,
        nis: Option<String>,
        nama_siswa: Option<String>,
        nama_kelas: Option<String>,
    ) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            nis,
            nama_siswa,
            nama_kelas,
            jenis: model.jenis,
            jumlah: model.jumlah,
            tanggal: model.tanggal,
            saldo_setelah: model.saldo_setelah,
            keterangan: model.keterangan,
            admin: model.admin,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    Applied,
    Queued,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitTransactionResponse {
    pub status: SubmitStatus,
    /// id transaksi di database utama (hanya bila `applied`)
    pub transaction_id: Option<Uuid>,
    /// id antrian offline (hanya bila `queued`)
    pub offline_id: Option<String>,
    pub saldo_sebelum: Option<i64>,
    pub saldo_setelah: Option<i64>,
    pub message: String,
}

/// Hasil hitung ulang saldo seorang siswa.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecalculateResponse {
    pub student_id: Uuid,
    pub saldo_lama: i64,
    pub saldo_baru: i64,
    pub transaksi_diperbarui: u64,
}
