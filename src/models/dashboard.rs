use super::TransactionResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyChartPoint {
    /// `YYYY-MM`
    pub bulan: String,
    pub setor: i64,
    pub tarik: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_siswa: u64,
    pub total_kelas: u64,
    pub total_saldo: i64,
    pub transaksi_hari_ini: u64,
    pub setor_hari_ini: i64,
    pub tarik_hari_ini: i64,
    pub chart_data: Vec<MonthlyChartPoint>,
    pub pending_offline: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kelas_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportTotals {
    pub total_setor: i64,
    pub total_tarik: i64,
    pub net: i64,
    pub jumlah_transaksi: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kelas_id: Option<Uuid>,
    pub totals: ReportTotals,
    pub transactions: Vec<TransactionResponse>,
}

/// Ringkasan harian untuk laporan WhatsApp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailySummary {
    pub tanggal: NaiveDate,
    pub jumlah_setor: u64,
    pub total_setor: i64,
    pub jumlah_tarik: u64,
    pub total_tarik: i64,
    pub total_saldo: i64,
    pub total_siswa: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyReportResult {
    pub summary: DailySummary,
    pub sent_to: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyReportQuery {
    /// default hari ini
    pub tanggal: Option<NaiveDate>,
}
