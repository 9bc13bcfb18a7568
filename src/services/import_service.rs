use crate::database::DbPool;
use crate::entities::{TransactionKind, class_entity as classes, transaction_entity as transactions};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::ledger::{NewTransaction, compute_new_saldo};
use crate::models::{ImportReport, ImportRowError, StudentImportReport};
use crate::services::class_service::{find_by_name, insert_class};
use crate::services::student_service::{find_by_nis, insert_student};
use crate::services::transaction_service::{adjust_saldo, insert_row, lock_student, resnapshot};
use crate::utils::csv::{CsvTable, parse_amount};
use crate::utils::validation::{
    ValidTransaction, parse_tanggal, today, validate_nama, validate_nama_kelas, validate_nis,
    validate_transaction,
};
use crate::utils::{sanitize_input, sanitize_nis, sanitize_optional};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait};
use std::collections::HashMap;
use uuid::Uuid;

const NIS_COLUMNS: &[&str] = &["nis"];
const JENIS_COLUMNS: &[&str] = &["jenis", "tipe", "type"];
const TANGGAL_COLUMNS: &[&str] = &["tanggal", "date"];
const JUMLAH_COLUMNS: &[&str] = &["jumlah", "nominal", "amount"];
const KETERANGAN_COLUMNS: &[&str] = &["keterangan", "catatan", "note"];
const NAMA_COLUMNS: &[&str] = &["nama", "nama siswa", "name"];
const KELAS_COLUMNS: &[&str] = &["kelas", "nama kelas", "class"];

struct ParsedRow {
    line: usize,
    nis: String,
    tx: ValidTransaction,
}

/// Import massal dari CSV.
#[derive(Clone)]
pub struct ImportService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl ImportService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    /// Kolom `NIS,Jenis,Tanggal,Jumlah[,Keterangan]`. Baris dikelompokkan
    /// per NIS sesuai urutan file; tiap siswa ditulis dalam satu transaksi
    /// database dengan saldo berjalan.
    pub async fn import_transactions(&self, csv: &str, admin: &str) -> AppResult<ImportReport> {
        let table = CsvTable::parse(csv);
        let nis_col = require(&table, NIS_COLUMNS, "NIS")?;
        let jenis_col = require(&table, JENIS_COLUMNS, "Jenis")?;
        let tanggal_col = require(&table, TANGGAL_COLUMNS, "Tanggal")?;
        let jumlah_col = require(&table, JUMLAH_COLUMNS, "Jumlah")?;
        let keterangan_col = table.column(KETERANGAN_COLUMNS);

        let mut report = ImportReport {
            total_rows: table.rows.len(),
            ..Default::default()
        };
        let today = today();

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<ParsedRow>> = HashMap::new();
        for (line, row) in &table.rows {
            let nis = sanitize_nis(CsvTable::field(row, Some(nis_col)));
            let parsed = parse_row(
                row,
                jenis_col,
                tanggal_col,
                jumlah_col,
                keterangan_col,
                today,
            );
            match parsed {
                Ok(tx) if !nis.is_empty() => {
                    if !groups.contains_key(&nis) {
                        order.push(nis.clone());
                    }
                    groups
                        .entry(nis.clone())
                        .or_default()
                        .push(ParsedRow {
                            line: *line,
                            nis,
                            tx,
                        });
                }
                Ok(_) => report.errors.push(row_error(*line, &nis, "NIS kosong")),
                Err(e) => report.errors.push(row_error(*line, &nis, &message_of(&e))),
            }
        }

        let mut touched: Vec<Uuid> = Vec::new();
        for nis in order {
            let Some(rows) = groups.remove(&nis) else {
                continue;
            };
            let Some(student) = find_by_nis(&self.pool, &nis).await? else {
                for row in rows {
                    report.errors.push(row_error(
                        row.line,
                        &row.nis,
                        "Siswa dengan NIS ini tidak ditemukan",
                    ));
                }
                continue;
            };

            let txn = self.pool.begin().await?;
            // saldo dibaca ulang di dalam transaksi, terkunci sampai commit
            let opening = lock_student(&txn, student.id).await?.saldo;
            let mut running = opening;
            let mut inserted = 0;
            for row in rows {
                let duplicate = transactions::Entity::find()
                    .filter(transactions::Column::StudentId.eq(student.id))
                    .filter(transactions::Column::Tanggal.eq(row.tx.tanggal))
                    .filter(transactions::Column::Jenis.eq(row.tx.jenis))
                    .filter(transactions::Column::Jumlah.eq(row.tx.jumlah))
                    .count(&txn)
                    .await?
                    > 0;
                if duplicate {
                    report.skipped_duplicates += 1;
                    continue;
                }

                let new_saldo = match compute_new_saldo(running, row.tx.jenis, row.tx.jumlah) {
                    Ok(s) => s,
                    Err(e) => {
                        report
                            .errors
                            .push(row_error(row.line, &row.nis, &message_of(&e)));
                        continue;
                    }
                };
                let tx = NewTransaction {
                    student_id: student.id,
                    jenis: row.tx.jenis,
                    jumlah: row.tx.jumlah,
                    tanggal: row.tx.tanggal,
                    keterangan: row.tx.keterangan,
                    admin: admin.to_string(),
                };
                insert_row(&txn, Uuid::now_v7(), &tx, new_saldo, Utc::now()).await?;
                running = new_saldo;
                inserted += 1;
            }

            if inserted > 0 {
                let Some(saldo) = adjust_saldo(&txn, student.id, running - opening).await? else {
                    return Err(AppError::InsufficientBalance {
                        saldo: opening,
                        jumlah: opening - running,
                    });
                };
                resnapshot(&txn, student.id, saldo).await?;
                touched.push(student.id);
            }
            txn.commit().await?;
            report.processed_students += 1;
            report.inserted += inserted;
        }

        log::info!(
            "Imported transactions: {} inserted, {} duplicates, {} errors from {} rows",
            report.inserted,
            report.skipped_duplicates,
            report.errors.len(),
            report.total_rows
        );
        if report.inserted > 0 {
            self.feed
                .publish(ChangeTable::Transactions, ChangeAction::Insert, None);
            for id in touched {
                self.feed
                    .publish(ChangeTable::Students, ChangeAction::Update, Some(id));
            }
        }
        Ok(report)
    }

    /// Kolom `NIS,Nama,Kelas`. Kelas yang belum ada dibuat; NIS yang sudah
    /// terdaftar dilewati.
    pub async fn import_students(&self, csv: &str) -> AppResult<StudentImportReport> {
        let table = CsvTable::parse(csv);
        let nis_col = require(&table, NIS_COLUMNS, "NIS")?;
        let nama_col = require(&table, NAMA_COLUMNS, "Nama")?;
        let kelas_col = require(&table, KELAS_COLUMNS, "Kelas")?;

        let mut report = StudentImportReport {
            total_rows: table.rows.len(),
            ..Default::default()
        };
        let mut class_cache: HashMap<String, classes::Model> = HashMap::new();

        let txn = self.pool.begin().await?;
        for (line, row) in &table.rows {
            let nis = sanitize_nis(CsvTable::field(row, Some(nis_col)));
            let nama = sanitize_input(CsvTable::field(row, Some(nama_col)));
            let nama_kelas = sanitize_input(CsvTable::field(row, Some(kelas_col)));

            let checked = validate_nis(&nis)
                .and_then(|_| validate_nama(&nama))
                .and_then(|_| validate_nama_kelas(&nama_kelas));
            if let Err(e) = checked {
                report.errors.push(row_error(*line, &nis, &message_of(&e)));
                continue;
            }
            if find_by_nis(&txn, &nis).await?.is_some() {
                report.skipped_existing += 1;
                continue;
            }

            let class = match class_cache.get(&nama_kelas) {
                Some(c) => c.clone(),
                None => {
                    let class = match find_by_name(&txn, &nama_kelas).await? {
                        Some(c) => c,
                        None => {
                            report.classes_created += 1;
                            insert_class(&txn, &nama_kelas).await?
                        }
                    };
                    class_cache.insert(nama_kelas.clone(), class.clone());
                    class
                }
            };
            insert_student(&txn, &nis, &nama, class.id).await?;
            report.created += 1;
        }
        txn.commit().await?;

        log::info!(
            "Imported students: {} created, {} existing, {} classes created, {} errors",
            report.created,
            report.skipped_existing,
            report.classes_created,
            report.errors.len()
        );
        if report.classes_created > 0 {
            self.feed.publish(ChangeTable::Classes, ChangeAction::Insert, None);
        }
        if report.created > 0 {
            self.feed.publish(ChangeTable::Students, ChangeAction::Insert, None);
        }
        Ok(report)
    }
}

fn require(table: &CsvTable, names: &[&str], label: &str) -> AppResult<usize> {
    table
        .column(names)
        .ok_or_else(|| AppError::ValidationError(format!("Kolom {label} tidak ditemukan")))
}

fn parse_row(
    row: &[String],
    jenis_col: usize,
    tanggal_col: usize,
    jumlah_col: usize,
    keterangan_col: Option<usize>,
    today: chrono::NaiveDate,
) -> AppResult<ValidTransaction> {
    let raw_jenis = CsvTable::field(row, Some(jenis_col));
    let jenis = TransactionKind::parse(raw_jenis).ok_or_else(|| {
        AppError::ValidationError(format!("Jenis tidak valid: {raw_jenis} (Setor/Tarik)"))
    })?;
    let tanggal = parse_tanggal(CsvTable::field(row, Some(tanggal_col)))?;
    let raw_jumlah = CsvTable::field(row, Some(jumlah_col));
    let jumlah = parse_amount(raw_jumlah)
        .ok_or_else(|| AppError::ValidationError(format!("Jumlah tidak valid: {raw_jumlah}")))?;
    let keterangan = sanitize_optional(Some(CsvTable::field(row, keterangan_col)));
    validate_transaction(jenis, jumlah, tanggal, keterangan, today)
}

fn row_error(line: usize, nis: &str, message: &str) -> ImportRowError {
    ImportRowError {
        line,
        nis: nis.to_string(),
        message: message.to_string(),
    }
}

/// Pesan untuk pengguna tanpa awalan teknis.
fn message_of(e: &AppError) -> String {
    match e {
        AppError::ValidationError(msg) => msg.clone(),
        AppError::InsufficientBalance { saldo, jumlah } => {
            format!("Saldo tidak mencukupi (saldo {saldo}, penarikan {jumlah})")
        }
        other => other.to_string(),
    }
}

pub const TRANSACTION_TEMPLATE: &str =
    "NIS,Jenis,Tanggal,Jumlah,Keterangan\n1001,Setor,2025-01-06,50000,Tabungan mingguan\n";
pub const STUDENT_TEMPLATE: &str = "NIS,Nama,Kelas\n1001,Budi Santoso,VII A\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_class, seed_student};
    use crate::entities::student_entity as students;

    const CSV: &str = "NIS,Jenis,Tanggal,Jumlah,Keterangan\n\
        1001,Setor,2025-01-01,50.000,awal\n\
        1001,Tarik,02/01/2025,20000,\n\
        1001,Setor,2025-01-03,10000,\n";

    async fn saldo(db: &DbPool, id: Uuid) -> i64 {
        students::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .saldo
    }

    #[tokio::test]
    async fn test_import_then_reimport_skips_duplicates() {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        let student = seed_student(&db, class.id, "1001", "Budi", 0).await;
        let svc = ImportService::new(db.clone(), ChangeFeed::default());

        let first = svc.import_transactions(CSV, "admin").await.unwrap();
        assert_eq!(first.total_rows, 3);
        assert_eq!(first.inserted, 3);
        assert!(first.errors.is_empty());
        assert_eq!(saldo(&db, student.id).await, 40_000);

        let again = svc.import_transactions(CSV, "admin").await.unwrap();
        assert_eq!(again.skipped_duplicates, 3);
        assert_eq!(again.inserted, 0);
        assert_eq!(saldo(&db, student.id).await, 40_000);
    }

    #[tokio::test]
    async fn test_import_adds_to_current_balance() {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        let student = seed_student(&db, class.id, "1001", "Budi", 0).await;
        let svc = ImportService::new(db.clone(), ChangeFeed::default());

        svc.import_transactions(CSV, "admin").await.unwrap();
        // setoran dari jalur lain sesudah import pertama
        adjust_saldo(&db, student.id, 15_000).await.unwrap();

        let csv = "NIS,Jenis,Tanggal,Jumlah
1001,Setor,2025-01-04,5000
";
        let report = svc.import_transactions(csv, "admin").await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(saldo(&db, student.id).await, 60_000);
    }

    #[tokio::test]
    async fn test_row_errors_are_reported_with_line_numbers() {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        seed_student(&db, class.id, "1001", "Budi", 1_000).await;
        let svc = ImportService::new(db.clone(), ChangeFeed::default());

        let csv = "nis;jenis;tanggal;jumlah\n\
            1001;Tarik;2025-01-01;5000\n\
            1001;Bonus;2025-01-01;5000\n\
            9999;Setor;2025-01-01;5000\n\
            1001;Setor;2025-01-01;500\n\
            1001;Setor;2025-01-02;2000\n";
        let report = svc.import_transactions(csv, "admin").await.unwrap();
        assert_eq!(report.inserted, 1);
        let lines: Vec<usize> = {
            let mut l: Vec<usize> = report.errors.iter().map(|e| e.line).collect();
            l.sort();
            l
        };
        assert_eq!(lines, vec![2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_missing_column() {
        let db = memory_db().await;
        let svc = ImportService::new(db, ChangeFeed::default());
        assert!(matches!(
            svc.import_transactions("NIS,Jenis,Jumlah\n1,Setor,1000\n", "admin").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_import_students_creates_classes() {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        seed_student(&db, class.id, "1001", "Budi", 0).await;
        let svc = ImportService::new(db.clone(), ChangeFeed::default());

        let csv = "NIS,Nama,Kelas\n1001,Budi,VII A\n1002,Sari,VII A\n1003,Andi,VIII B\n1004,X,VIII B\n";
        let report = svc.import_students(csv).await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.classes_created, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(students::Entity::find().count(&db).await.unwrap(), 3);
    }

    #[test]
    fn test_templates_parse() {
        let table = CsvTable::parse(TRANSACTION_TEMPLATE);
        assert!(table.column(JUMLAH_COLUMNS).is_some());
        assert_eq!(table.rows.len(), 1);
        assert!(CsvTable::parse(STUDENT_TEMPLATE).column(KELAS_COLUMNS).is_some());
    }
}
