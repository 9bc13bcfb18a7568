use crate::database::DbPool;
use crate::entities::{TransactionKind, student_entity as students, transaction_entity as transactions};
use crate::error::{AppError, AppResult};
use crate::external::WhatsAppClient;
use crate::models::{DailyReportResult, DailySummary};
use crate::services::SchoolService;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};

/// Laporan harian ke WhatsApp pengelola.
#[derive(Clone)]
pub struct ReportService {
    pool: DbPool,
    school: SchoolService,
    whatsapp: WhatsAppClient,
}

impl ReportService {
    pub fn new(pool: DbPool, school: SchoolService, whatsapp: WhatsAppClient) -> Self {
        Self {
            pool,
            school,
            whatsapp,
        }
    }

    pub async fn daily_summary(&self, tanggal: NaiveDate) -> AppResult<DailySummary> {
        let rows: Vec<(TransactionKind, i64)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Jenis)
            .column(transactions::Column::Jumlah)
            .filter(transactions::Column::Tanggal.eq(tanggal))
            .into_tuple()
            .all(&self.pool)
            .await?;
        let saldo_list: Vec<i64> = students::Entity::find()
            .select_only()
            .column(students::Column::Saldo)
            .into_tuple()
            .all(&self.pool)
            .await?;

        let mut summary = DailySummary {
            tanggal,
            jumlah_setor: 0,
            total_setor: 0,
            jumlah_tarik: 0,
            total_tarik: 0,
            total_saldo: saldo_list.iter().sum(),
            total_siswa: saldo_list.len() as u64,
        };
        for (jenis, jumlah) in rows {
            match jenis {
                TransactionKind::Setor => {
                    summary.jumlah_setor += 1;
                    summary.total_setor += jumlah;
                }
                TransactionKind::Tarik => {
                    summary.jumlah_tarik += 1;
                    summary.total_tarik += jumlah;
                }
            }
        }
        Ok(summary)
    }

    /// Kirim ringkasan `tanggal` ke semua nomor tujuan. Kegagalan per nomor
    /// dicatat di `failed`, tidak menghentikan pengiriman lain.
    pub async fn send_daily_report(&self, tanggal: NaiveDate) -> AppResult<DailyReportResult> {
        if self.whatsapp.targets().is_empty() {
            return Err(AppError::ConfigError(
                "Belum ada nomor tujuan laporan".into(),
            ));
        }
        let summary = self.daily_summary(tanggal).await?;
        let nama_sekolah = self
            .school
            .find()
            .await?
            .map(|s| s.nama_sekolah)
            .unwrap_or_default();
        let message = format_message(&nama_sekolah, &summary);

        let mut sent_to = Vec::new();
        let mut failed = Vec::new();
        for target in self.whatsapp.targets() {
            match self.whatsapp.send_message(target, &message).await {
                Ok(()) => sent_to.push(target.clone()),
                Err(e) => {
                    log::error!("Daily report to {target} failed: {e}");
                    failed.push(target.clone());
                }
            }
        }
        log::info!(
            "Daily report {tanggal} sent to {} target(s), {} failed",
            sent_to.len(),
            failed.len()
        );
        Ok(DailyReportResult {
            summary,
            sent_to,
            failed,
        })
    }
}

/// `1250000` -> `Rp 1.250.000`
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

pub fn format_message(nama_sekolah: &str, s: &DailySummary) -> String {
    let header = if nama_sekolah.is_empty() {
        "*Laporan Harian Tabungan Siswa*".to_string()
    } else {
        format!("*Laporan Harian Tabungan Siswa*\n{nama_sekolah}")
    };
    format!(
        "{header}\nTanggal: {}\n\n\
         Setoran: {} transaksi ({})\n\
         Penarikan: {} transaksi ({})\n\
         Selisih: {}\n\n\
         Total saldo: {}\n\
         Jumlah siswa: {}",
        s.tanggal.format("%d/%m/%Y"),
        s.jumlah_setor,
        format_rupiah(s.total_setor),
        s.jumlah_tarik,
        format_rupiah(s.total_tarik),
        format_rupiah(s.total_setor - s.total_tarik),
        format_rupiah(s.total_saldo),
        s.total_siswa,
    )
}

/// Waktu kirim berikutnya setelah `now` untuk jadwal `HH:MM`.
pub fn next_run_after(now: NaiveDateTime, send_time: &str) -> AppResult<NaiveDateTime> {
    let time = NaiveTime::parse_from_str(send_time.trim(), "%H:%M").map_err(|_| {
        AppError::ConfigError(format!("Jam kirim laporan tidak valid: {send_time}"))
    })?;
    let today = now.date().and_time(time);
    Ok(if today > now {
        today
    } else {
        today + Duration::days(1)
    })
}
