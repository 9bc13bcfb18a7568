use crate::database::DbPool;
use crate::entities::{
    TransactionKind, class_entity as classes, student_entity as students,
    transaction_entity as transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{DashboardStats, MonthlyChartPoint, ReportQuery, ReportResponse, ReportTotals};
use crate::offline::OfflineQueue;
use crate::services::transaction_service::with_display_fields;
use chrono::{Datelike, NaiveDate};
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::BTreeMap;

const CHART_MONTHS: i32 = 6;

#[derive(Clone)]
pub struct DashboardService {
    pool: DbPool,
    queue: OfflineQueue,
}

impl DashboardService {
    pub fn new(pool: DbPool, queue: OfflineQueue) -> Self {
        Self { pool, queue }
    }

    pub async fn stats(&self, today: NaiveDate) -> AppResult<DashboardStats> {
        let total_siswa = students::Entity::find().count(&self.pool).await?;
        let total_kelas = classes::Entity::find().count(&self.pool).await?;
        let saldo_list: Vec<i64> = students::Entity::find()
            .select_only()
            .column(students::Column::Saldo)
            .into_tuple()
            .all(&self.pool)
            .await?;

        let window_start = months_back(today, CHART_MONTHS - 1);
        let rows: Vec<(NaiveDate, TransactionKind, i64)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Tanggal)
            .column(transactions::Column::Jenis)
            .column(transactions::Column::Jumlah)
            .filter(transactions::Column::Tanggal.gte(window_start))
            .filter(transactions::Column::Tanggal.lte(today))
            .into_tuple()
            .all(&self.pool)
            .await?;

        let today_rows: Vec<&(NaiveDate, TransactionKind, i64)> =
            rows.iter().filter(|(t, _, _)| *t == today).collect();
        let sum_of = |kind: TransactionKind| -> i64 {
            today_rows
                .iter()
                .filter(|(_, j, _)| *j == kind)
                .map(|(_, _, n)| n)
                .sum()
        };

        Ok(DashboardStats {
            total_siswa,
            total_kelas,
            total_saldo: saldo_list.iter().sum(),
            transaksi_hari_ini: today_rows.len() as u64,
            setor_hari_ini: sum_of(TransactionKind::Setor),
            tarik_hari_ini: sum_of(TransactionKind::Tarik),
            chart_data: monthly_chart(today, &rows),
            pending_offline: self.queue.get_pending_count().await?,
        })
    }

    /// Laporan rentang tanggal, opsional per kelas.
    pub async fn report(&self, query: &ReportQuery) -> AppResult<ReportResponse> {
        if query.start_date > query.end_date {
            return Err(AppError::ValidationError(
                "Tanggal awal tidak boleh setelah tanggal akhir".into(),
            ));
        }

        let mut select = transactions::Entity::find()
            .filter(transactions::Column::Tanggal.gte(query.start_date))
            .filter(transactions::Column::Tanggal.lte(query.end_date));
        if let Some(kelas_id) = query.kelas_id {
            select = select.filter(
                transactions::Column::StudentId.in_subquery(
                    Query::select()
                        .column(students::Column::Id)
                        .from(students::Entity)
                        .and_where(students::Column::KelasId.eq(kelas_id))
                        .to_owned(),
                ),
            );
        }
        let rows = select
            .order_by_asc(transactions::Column::Tanggal)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        let totals = totals_of(rows.iter().map(|r| (r.jenis, r.jumlah)));
        Ok(ReportResponse {
            start_date: query.start_date,
            end_date: query.end_date,
            kelas_id: query.kelas_id,
            totals,
            transactions: with_display_fields(&self.pool, rows).await?,
        })
    }
}

pub fn totals_of<I>(rows: I) -> ReportTotals
where
    I: IntoIterator<Item = (TransactionKind, i64)>,
{
    let mut totals = ReportTotals::default();
    for (jenis, jumlah) in rows {
        match jenis {
            TransactionKind::Setor => totals.total_setor += jumlah,
            TransactionKind::Tarik => totals.total_tarik += jumlah,
        }
        totals.jumlah_transaksi += 1;
    }
    totals.net = totals.total_setor - totals.total_tarik;
    totals
}

/// Tanggal 1 pada bulan `n` bulan sebelum `date`.
fn months_back(date: NaiveDate, n: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 - n;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(date)
}

/// Total setor/tarik per bulan untuk enam bulan terakhir, bulan tanpa
/// transaksi tetap muncul dengan nilai nol.
pub fn monthly_chart(
    today: NaiveDate,
    rows: &[(NaiveDate, TransactionKind, i64)],
) -> Vec<MonthlyChartPoint> {
    let mut buckets: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for n in 0..CHART_MONTHS {
        buckets.insert(months_back(today, n).format("%Y-%m").to_string(), (0, 0));
    }
    for (tanggal, jenis, jumlah) in rows {
        let key = tanggal.format("%Y-%m").to_string();
        if let Some(bucket) = buckets.get_mut(&key) {
            match jenis {
                TransactionKind::Setor => bucket.0 += jumlah,
                TransactionKind::Tarik => bucket.1 += jumlah,
            }
        }
    }
    buckets
        .into_iter()
        .map(|(bulan, (setor, tarik))| MonthlyChartPoint {
            bulan,
            setor,
            tarik,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_class, seed_student};
    use crate::events::ChangeFeed;
    use crate::ledger::{Ledger, NewTransaction};
    use crate::offline::queue::test_support::memory_queue;
    use crate::services::TransactionService;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_months_back_crosses_year() {
        assert_eq!(months_back(d(2025, 2, 17), 5), d(2024, 9, 1));
        assert_eq!(months_back(d(2025, 2, 17), 0), d(2025, 2, 1));
    }

    #[test]
    fn test_monthly_chart_fills_empty_months() {
        let rows = vec![
            (d(2025, 2, 3), TransactionKind::Setor, 10_000),
            (d(2025, 2, 4), TransactionKind::Tarik, 4_000),
            (d(2024, 11, 30), TransactionKind::Setor, 7_000),
            (d(2024, 1, 1), TransactionKind::Setor, 99_000),
        ];
        let chart = monthly_chart(d(2025, 2, 17), &rows);
        assert_eq!(chart.len(), 6);
        assert_eq!(chart[0].bulan, "2024-09");
        assert_eq!(chart[2].setor, 7_000);
        assert_eq!(
            chart[5],
            MonthlyChartPoint {
                bulan: "2025-02".into(),
                setor: 10_000,
                tarik: 4_000,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_and_report() {
        let db = memory_db().await;
        let a = seed_class(&db, "VII A").await;
        let b = seed_class(&db, "VII B").await;
        let s1 = seed_student(&db, a.id, "1001", "Budi", 0).await;
        let s2 = seed_student(&db, b.id, "1002", "Sari", 0).await;
        let ledger = TransactionService::new(db.clone(), ChangeFeed::default());
        let today = d(2025, 3, 10);
        let add = |student_id: Uuid, jenis, jumlah, tanggal| NewTransaction {
            student_id,
            jenis,
            jumlah,
            tanggal,
            keterangan: None,
            admin: "admin".into(),
        };
        ledger.apply(add(s1.id, TransactionKind::Setor, 20_000, d(2025, 3, 1))).await.unwrap();
        ledger.apply(add(s1.id, TransactionKind::Tarik, 5_000, today)).await.unwrap();
        ledger.apply(add(s2.id, TransactionKind::Setor, 8_000, today)).await.unwrap();

        let svc = DashboardService::new(db.clone(), memory_queue().await);
        let stats = svc.stats(today).await.unwrap();
        assert_eq!(stats.total_siswa, 2);
        assert_eq!(stats.total_kelas, 2);
        assert_eq!(stats.total_saldo, 23_000);
        assert_eq!(stats.transaksi_hari_ini, 2);
        assert_eq!(stats.setor_hari_ini, 8_000);
        assert_eq!(stats.tarik_hari_ini, 5_000);
        assert_eq!(stats.chart_data.last().unwrap().setor, 28_000);
        assert_eq!(stats.pending_offline, 0);

        let report = svc
            .report(&ReportQuery {
                start_date: d(2025, 3, 1),
                end_date: today,
                kelas_id: Some(a.id),
            })
            .await
            .unwrap();
        assert_eq!(report.totals.jumlah_transaksi, 2);
        assert_eq!(report.totals.net, 15_000);
        assert_eq!(report.transactions[0].nama_kelas.as_deref(), Some("VII A"));

        assert!(
            svc.report(&ReportQuery {
                start_date: today,
                end_date: d(2025, 3, 1),
                kelas_id: None,
            })
            .await
            .is_err()
        );
    }
}
