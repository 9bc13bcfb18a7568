//! Perhitungan saldo tabungan.
//!
//! Semua jalur tulis (form transaksi, sinkronisasi offline, import massal,
//! edit/hapus transaksi) memakai fungsi di modul ini sehingga aturan saldo
//! hanya ada di satu tempat.

use crate::entities::TransactionKind;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Saldo baru setelah satu transaksi. Penarikan melebihi saldo ditolak.
pub fn compute_new_saldo(current: i64, jenis: TransactionKind, jumlah: i64) -> AppResult<i64> {
    if jumlah <= 0 {
        return Err(AppError::ValidationError(
            "Jumlah harus lebih dari 0".to_string(),
        ));
    }
    let new_saldo = current + jenis.signed(jumlah);
    if new_saldo < 0 {
        return Err(AppError::InsufficientBalance {
            saldo: current,
            jumlah,
        });
    }
    Ok(new_saldo)
}

/// Satu baris riwayat yang ikut di-replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub id: Uuid,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub saldo_setelah: i64,
}

/// Mengurutkan riwayat menurut (tanggal, created_at, id) lalu mengisi
/// `saldo_setelah` secara kumulatif mulai dari `opening`. Mengembalikan
/// saldo akhir.
pub fn replay(opening: i64, entries: &mut [ReplayEntry]) -> i64 {
    entries.sort_by(|a, b| {
        a.tanggal
            .cmp(&b.tanggal)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    let mut running = opening;
    for entry in entries.iter_mut() {
        running += entry.jenis.signed(entry.jumlah);
        entry.saldo_setelah = running;
    }
    running
}

/// Jumlah efek semua transaksi (tanpa urutan).
pub fn net_effect<I>(entries: I) -> i64
where
    I: IntoIterator<Item = (TransactionKind, i64)>,
{
    entries.into_iter().map(|(jenis, jumlah)| jenis.signed(jumlah)).sum()
}

/// Transaksi yang akan dicatat ke buku besar.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub student_id: Uuid,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    pub tanggal: NaiveDate,
    pub keterangan: Option<String>,
    pub admin: String,
}

/// Hasil pencatatan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransaction {
    pub id: Uuid,
    pub student_id: Uuid,
    pub saldo_sebelum: i64,
    pub saldo_setelah: i64,
}

pub type LedgerRef = Arc<dyn Ledger>;

/// Penyimpanan saldo siswa. `apply` wajib mengubah saldo dan menulis baris
/// transaksi sebagai satu kesatuan.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn current_balance(&self, student_id: Uuid) -> AppResult<i64>;

    async fn apply(&self, tx: NewTransaction) -> AppResult<AppliedTransaction>;
}
