use super::TransactionResponse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub nis: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentInfo {
    pub nis: String,
    pub nama: String,
    pub nama_kelas: Option<String>,
    pub saldo: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentSessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub student: StudentInfo,
}

#[derive(Debug, Deserialize)]
pub struct StudentTransactionsQuery {
    pub limit: Option<u64>,
}

/// Hasil scan QR buku tabungan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PassbookVerification {
    pub valid: bool,
    pub nis: String,
    pub nama: String,
    pub nama_kelas: Option<String>,
    pub saldo: i64,
    pub jumlah_transaksi: u64,
    pub transaksi_terakhir: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PassbookData {
    pub nama_sekolah: Option<String>,
    pub alamat_sekolah: Option<String>,
    pub student: StudentInfo,
    pub transactions: Vec<TransactionResponse>,
    pub verification_url: String,
    pub dicetak_pada: DateTime<Utc>,
}
