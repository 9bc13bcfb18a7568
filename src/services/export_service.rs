use crate::config::AppConfig;
use crate::database::DbPool;
use crate::entities::{
    class_entity as classes, school_data_entity as school, student_entity as students,
    student_session_entity as sessions, transaction_entity as transactions,
    wali_kelas_entity as wali_kelas,
};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{
    BACKUP_VERSION, BackupFile, PassbookData, RestoreSummary, StudentInfo, TransactionQuery,
};
use crate::services::transaction_service::{class_names, filtered, with_display_fields};
use crate::utils::csv::csv_line;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashSet;
use uuid::Uuid;

const INSERT_CHUNK: usize = 100;

#[derive(Clone)]
pub struct ExportService {
    pool: DbPool,
    feed: ChangeFeed,
    app: AppConfig,
}

impl ExportService {
    pub fn new(pool: DbPool, feed: ChangeFeed, app: AppConfig) -> Self {
        Self { pool, feed, app }
    }

    pub async fn transactions_csv(&self, query: &TransactionQuery) -> AppResult<String> {
        let rows = filtered(query)
            .order_by_asc(transactions::Column::Tanggal)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.pool)
            .await?;
        let rows = with_display_fields(&self.pool, rows).await?;

        let mut out = String::from(
            "Tanggal,NIS,Nama,Kelas,Jenis,Jumlah,Saldo Setelah,Keterangan,Admin\n",
        );
        for t in rows {
            out.push_str(&csv_line(&[
                t.tanggal.format("%Y-%m-%d").to_string(),
                t.nis.unwrap_or_default(),
                t.nama_siswa.unwrap_or_default(),
                t.nama_kelas.unwrap_or_default(),
                t.jenis.to_string(),
                t.jumlah.to_string(),
                t.saldo_setelah.to_string(),
                t.keterangan.unwrap_or_default(),
                t.admin,
            ]));
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn students_csv(&self, kelas_id: Option<Uuid>) -> AppResult<String> {
        let mut select = students::Entity::find();
        if let Some(kelas_id) = kelas_id {
            select = select.filter(students::Column::KelasId.eq(kelas_id));
        }
        let rows = select
            .order_by_asc(students::Column::Nis)
            .all(&self.pool)
            .await?;
        let names = class_names(&self.pool, rows.iter().map(|s| s.kelas_id).collect()).await?;

        let mut out = String::from("NIS,Nama,Kelas,Saldo\n");
        for s in rows {
            out.push_str(&csv_line(&[
                s.nis,
                s.nama,
                names.get(&s.kelas_id).cloned().unwrap_or_default(),
                s.saldo.to_string(),
            ]));
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn backup(&self) -> AppResult<BackupFile> {
        let file = BackupFile {
            timestamp: Utc::now(),
            version: BACKUP_VERSION.to_string(),
            school_data: school::Entity::find().all(&self.pool).await?,
            classes: classes::Entity::find()
                .order_by_asc(classes::Column::NamaKelas)
                .all(&self.pool)
                .await?,
            students: students::Entity::find()
                .order_by_asc(students::Column::Nis)
                .all(&self.pool)
                .await?,
            transactions: transactions::Entity::find()
                .order_by_asc(transactions::Column::Tanggal)
                .order_by_asc(transactions::Column::CreatedAt)
                .all(&self.pool)
                .await?,
        };
        log::info!(
            "Created backup: {} classes, {} students, {} transactions",
            file.classes.len(),
            file.students.len(),
            file.transactions.len()
        );
        Ok(file)
    }

    /// Mengganti seluruh data dengan isi backup dalam satu transaksi database.
    pub async fn restore(&self, file: BackupFile) -> AppResult<RestoreSummary> {
        validate_backup(&file)?;

        let txn = self.pool.begin().await?;
        // penugasan wali kelas tidak ikut backup; yang kelasnya masih ada dipasang lagi
        let restored_classes: HashSet<Uuid> = file.classes.iter().map(|c| c.id).collect();
        let (kept_wali, dropped_wali): (Vec<_>, Vec<_>) = wali_kelas::Entity::find()
            .all(&txn)
            .await?
            .into_iter()
            .partition(|w| restored_classes.contains(&w.kelas_id));
        sessions::Entity::delete_many().exec(&txn).await?;
        transactions::Entity::delete_many().exec(&txn).await?;
        wali_kelas::Entity::delete_many().exec(&txn).await?;
        students::Entity::delete_many().exec(&txn).await?;
        classes::Entity::delete_many().exec(&txn).await?;
        school::Entity::delete_many().exec(&txn).await?;

        let summary = RestoreSummary {
            school_data: file.school_data.len(),
            classes: file.classes.len(),
            students: file.students.len(),
            transactions: file.transactions.len(),
            wali_kelas_kept: kept_wali.len(),
            wali_kelas_dropped: dropped_wali.len(),
        };
        insert_chunks(&txn, file.school_data, |m| school::ActiveModel {
            id: Set(m.id),
            nama_sekolah: Set(m.nama_sekolah),
            alamat: Set(m.alamat),
            telepon: Set(m.telepon),
            email: Set(m.email),
            kepala_sekolah: Set(m.kepala_sekolah),
            updated_at: Set(m.updated_at),
        })
        .await?;
        insert_chunks(&txn, file.classes, |m| classes::ActiveModel {
            id: Set(m.id),
            nama_kelas: Set(m.nama_kelas),
            created_at: Set(m.created_at),
            updated_at: Set(m.updated_at),
        })
        .await?;
        insert_chunks(&txn, file.students, |m| students::ActiveModel {
            id: Set(m.id),
            nis: Set(m.nis),
            nama: Set(m.nama),
            kelas_id: Set(m.kelas_id),
            saldo: Set(m.saldo),
            created_at: Set(m.created_at),
            updated_at: Set(m.updated_at),
        })
        .await?;
        insert_chunks(&txn, file.transactions, |m| transactions::ActiveModel {
            id: Set(m.id),
            student_id: Set(m.student_id),
            jenis: Set(m.jenis),
            jumlah: Set(m.jumlah),
            tanggal: Set(m.tanggal),
            saldo_setelah: Set(m.saldo_setelah),
            keterangan: Set(m.keterangan),
            admin: Set(m.admin),
            created_at: Set(m.created_at),
        })
        .await?;
        insert_chunks(&txn, kept_wali, |m| wali_kelas::ActiveModel {
            id: Set(m.id),
            user_id: Set(m.user_id),
            kelas_id: Set(m.kelas_id),
            nama: Set(m.nama),
            created_at: Set(m.created_at),
        })
        .await?;
        txn.commit().await?;

        if !dropped_wali.is_empty() {
            let names: Vec<&str> = dropped_wali.iter().map(|w| w.nama.as_str()).collect();
            log::warn!(
                "Restore dropped {} wali kelas assignment(s) whose class is gone: {}",
                dropped_wali.len(),
                names.join(", ")
            );
        }

        log::warn!(
            "Restored backup: {} classes, {} students, {} transactions",
            summary.classes,
            summary.students,
            summary.transactions
        );
        for table in [
            ChangeTable::SchoolData,
            ChangeTable::Classes,
            ChangeTable::Students,
            ChangeTable::Transactions,
            ChangeTable::WaliKelas,
        ] {
            self.feed.publish(table, ChangeAction::Update, None);
        }
        Ok(summary)
    }

    /// Data cetak buku tabungan beserta URL verifikasi untuk QR.
    pub async fn passbook(&self, student_id: Uuid) -> AppResult<PassbookData> {
        let student = students::Entity::find_by_id(student_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))?;
        let nama_kelas = classes::Entity::find_by_id(student.kelas_id)
            .one(&self.pool)
            .await?
            .map(|c| c.nama_kelas);
        let school = school::Entity::find().one(&self.pool).await?;
        let rows = transactions::Entity::find()
            .filter(transactions::Column::StudentId.eq(student_id))
            .order_by_asc(transactions::Column::Tanggal)
            .order_by_asc(transactions::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        Ok(PassbookData {
            nama_sekolah: school.as_ref().map(|s| s.nama_sekolah.clone()),
            alamat_sekolah: school.and_then(|s| s.alamat),
            verification_url: verification_url(&self.app.public_base_url, &student.nis),
            student: StudentInfo {
                nis: student.nis,
                nama: student.nama,
                nama_kelas,
                saldo: student.saldo,
            },
            transactions: with_display_fields(&self.pool, rows).await?,
            dicetak_pada: Utc::now(),
        })
    }
}

pub fn verification_url(base: &str, nis: &str) -> String {
    format!("{}/?nis={}", base.trim_end_matches('/'), nis)
}

fn validate_backup(file: &BackupFile) -> AppResult<()> {
    if file.version.trim().is_empty() {
        return Err(AppError::ValidationError(
            "File backup tidak valid: versi kosong".into(),
        ));
    }
    let class_ids: HashSet<Uuid> = file.classes.iter().map(|c| c.id).collect();
    if let Some(s) = file.students.iter().find(|s| !class_ids.contains(&s.kelas_id)) {
        return Err(AppError::ValidationError(format!(
            "File backup tidak valid: kelas siswa {} tidak ada",
            s.nis
        )));
    }
    let student_ids: HashSet<Uuid> = file.students.iter().map(|s| s.id).collect();
    if let Some(t) = file
        .transactions
        .iter()
        .find(|t| !student_ids.contains(&t.student_id))
    {
        return Err(AppError::ValidationError(format!(
            "File backup tidak valid: siswa untuk transaksi {} tidak ada",
            t.id
        )));
    }
    Ok(())
}

async fn insert_chunks<C, M, A, F>(conn: &C, models: Vec<M>, to_active: F) -> AppResult<()>
where
    C: ConnectionTrait,
    A: sea_orm::ActiveModelTrait + Send,
    F: Fn(M) -> A,
{
    let mut iter = models.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<A> = iter.by_ref().take(INSERT_CHUNK).map(&to_active).collect();
        <A::Entity as EntityTrait>::insert_many(chunk).exec(conn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_class, seed_student};
    use crate::entities::TransactionKind;
    use crate::ledger::{Ledger, NewTransaction};
    use crate::services::TransactionService;
    use chrono::NaiveDate;
    use sea_orm::{ActiveModelTrait, PaginatorTrait};

    async fn fixture() -> (ExportService, DbPool, Uuid) {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        let student = seed_student(&db, class.id, "1001", "Budi, S.Pd", 0).await;
        let ledger = TransactionService::new(db.clone(), ChangeFeed::default());
        for (jenis, jumlah, day) in [
            (TransactionKind::Setor, 50_000, 1),
            (TransactionKind::Tarik, 20_000, 2),
        ] {
            ledger
                .apply(NewTransaction {
                    student_id: student.id,
                    jenis,
                    jumlah,
                    tanggal: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                    keterangan: None,
                    admin: "admin".into(),
                })
                .await
                .unwrap();
        }
        let app = AppConfig {
            public_base_url: "https://tabungan.example.sch.id/".into(),
        };
        (ExportService::new(db.clone(), ChangeFeed::default(), app), db, student.id)
    }

    #[tokio::test]
    async fn test_csv_exports() {
        let (svc, _db, _) = fixture().await;
        let csv = svc.transactions_csv(&TransactionQuery::default()).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "2025-01-01,1001,\"Budi, S.Pd\",VII A,Setor,50000,50000,,admin"
        );
        assert!(lines[2].contains("Tarik,20000,30000"));

        let students = svc.students_csv(None).await.unwrap();
        assert_eq!(students, "NIS,Nama,Kelas,Saldo\n1001,\"Budi, S.Pd\",VII A,30000\n");
    }

    #[tokio::test]
    async fn test_backup_restore_round_trip() {
        let (svc, db, _) = fixture().await;
        let backup = svc.backup().await.unwrap();
        let json = serde_json::to_string(&backup).unwrap();

        // data berubah setelah backup
        let class = seed_class(&db, "IX Z").await;
        seed_student(&db, class.id, "9999", "Baru", 0).await;

        let parsed: BackupFile = serde_json::from_str(&json).unwrap();
        let summary = svc.restore(parsed).await.unwrap();
        assert_eq!(summary.students, 1);
        assert_eq!(summary.transactions, 2);
        assert_eq!(students::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(classes::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_restore_keeps_wali_kelas_of_surviving_classes() {
        let (svc, db, _) = fixture().await;
        let backup = svc.backup().await.unwrap();
        let kept_class = backup.classes[0].id;
        let gone_class = seed_class(&db, "IX Z").await;
        for (kelas_id, nama) in [(kept_class, "Bu Sari"), (gone_class.id, "Pak Joko")] {
            wali_kelas::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(Uuid::new_v4()),
                kelas_id: Set(kelas_id),
                nama: Set(nama.into()),
                created_at: Set(Utc::now()),
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let summary = svc.restore(backup).await.unwrap();
        assert_eq!(summary.wali_kelas_kept, 1);
        assert_eq!(summary.wali_kelas_dropped, 1);
        let rows = wali_kelas::Entity::find().all(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nama, "Bu Sari");
        assert_eq!(rows[0].kelas_id, kept_class);
    }

    #[tokio::test]
    async fn test_restore_rejects_dangling_references() {
        let (svc, db, _) = fixture().await;
        let mut backup = svc.backup().await.unwrap();
        backup.classes.clear();
        assert!(matches!(
            svc.restore(backup).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(students::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_passbook() {
        let (svc, _db, sid) = fixture().await;
        let book = svc.passbook(sid).await.unwrap();
        assert_eq!(book.student.saldo, 30_000);
        assert_eq!(book.transactions.len(), 2);
        assert_eq!(
            book.verification_url,
            "https://tabungan.example.sch.id/?nis=1001"
        );
    }
}
