use crate::database::DbPool;
use crate::entities::{
    class_entity as classes, student_entity as students, student_session_entity as sessions,
    transaction_entity as transactions, wali_kelas_entity as wali_kelas,
};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{ClassDeleteSummary, ClassResponse, CreateClassRequest, UpdateClassRequest};
use crate::utils::sanitize_input;
use crate::utils::validation::validate_nama_kelas;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct ClassService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl ClassService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn create_class(&self, req: CreateClassRequest) -> AppResult<ClassResponse> {
        let nama_kelas = sanitize_input(&req.nama_kelas);
        validate_nama_kelas(&nama_kelas)?;
        if find_by_name(&self.pool, &nama_kelas).await?.is_some() {
            return Err(AppError::Conflict(format!("Kelas {nama_kelas} sudah ada")));
        }

        let model = insert_class(&self.pool, &nama_kelas).await?;
        log::info!("Created class {} ({})", model.nama_kelas, model.id);
        self.feed
            .publish(ChangeTable::Classes, ChangeAction::Insert, Some(model.id));
        Ok(ClassResponse::from_model(model, 0, 0))
    }

    /// Semua kelas urut nama, dengan jumlah siswa dan total saldo.
    pub async fn list_classes(&self) -> AppResult<Vec<ClassResponse>> {
        let list = classes::Entity::find()
            .order_by_asc(classes::Column::NamaKelas)
            .all(&self.pool)
            .await?;
        let student_list = students::Entity::find().all(&self.pool).await?;

        let mut stats: HashMap<Uuid, (u64, i64)> = HashMap::new();
        for s in student_list {
            let entry = stats.entry(s.kelas_id).or_default();
            entry.0 += 1;
            entry.1 += s.saldo;
        }

        Ok(list
            .into_iter()
            .map(|c| {
                let (count, saldo) = stats.get(&c.id).copied().unwrap_or_default();
                ClassResponse::from_model(c, count, saldo)
            })
            .collect())
    }

    pub async fn get_class(&self, id: Uuid) -> AppResult<classes::Model> {
        classes::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Kelas tidak ditemukan".into()))
    }

    pub async fn update_class(&self, id: Uuid, req: UpdateClassRequest) -> AppResult<ClassResponse> {
        let nama_kelas = sanitize_input(&req.nama_kelas);
        validate_nama_kelas(&nama_kelas)?;
        let model = self.get_class(id).await?;
        if let Some(other) = find_by_name(&self.pool, &nama_kelas).await?
            && other.id != id
        {
            return Err(AppError::Conflict(format!("Kelas {nama_kelas} sudah ada")));
        }

        let mut am = model.into_active_model();
        am.nama_kelas = Set(nama_kelas);
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;

        self.feed
            .publish(ChangeTable::Classes, ChangeAction::Update, Some(id));
        let student_list = students::Entity::find()
            .filter(students::Column::KelasId.eq(id))
            .all(&self.pool)
            .await?;
        let total: i64 = student_list.iter().map(|s| s.saldo).sum();
        Ok(ClassResponse::from_model(
            updated,
            student_list.len() as u64,
            total,
        ))
    }

    /// Menghapus kelas beserta wali kelas, siswa, sesi dan transaksinya.
    pub async fn delete_class(&self, id: Uuid) -> AppResult<ClassDeleteSummary> {
        let txn = self.pool.begin().await?;
        classes::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Kelas tidak ditemukan".into()))?;

        let student_ids: Vec<Uuid> = students::Entity::find()
            .filter(students::Column::KelasId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let mut summary = ClassDeleteSummary::default();
        if !student_ids.is_empty() {
            summary.transactions = transactions::Entity::delete_many()
                .filter(transactions::Column::StudentId.is_in(student_ids.clone()))
                .exec(&txn)
                .await?
                .rows_affected;
            sessions::Entity::delete_many()
                .filter(sessions::Column::StudentId.is_in(student_ids))
                .exec(&txn)
                .await?;
        }
        summary.wali_kelas = wali_kelas::Entity::delete_many()
            .filter(wali_kelas::Column::KelasId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        summary.students = students::Entity::delete_many()
            .filter(students::Column::KelasId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        classes::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::warn!(
            "Deleted class {id} with {} students and {} transactions",
            summary.students,
            summary.transactions
        );
        self.feed
            .publish(ChangeTable::Classes, ChangeAction::Delete, Some(id));
        if summary.students > 0 {
            self.feed.publish(ChangeTable::Students, ChangeAction::Delete, None);
            self.feed
                .publish(ChangeTable::Transactions, ChangeAction::Delete, None);
        }
        Ok(summary)
    }
}

pub(crate) async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    nama_kelas: &str,
) -> AppResult<Option<classes::Model>> {
    Ok(classes::Entity::find()
        .filter(classes::Column::NamaKelas.eq(nama_kelas))
        .one(conn)
        .await?)
}

pub(crate) async fn insert_class<C: ConnectionTrait>(
    conn: &C,
    nama_kelas: &str,
) -> AppResult<classes::Model> {
    let now = Utc::now();
    Ok(classes::ActiveModel {
        id: Set(Uuid::new_v4()),
        nama_kelas: Set(nama_kelas.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_student};
    use crate::entities::TransactionKind;
    use crate::ledger::{Ledger, NewTransaction};
    use crate::services::TransactionService;
    use chrono::NaiveDate;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_create_list_update() {
        let db = memory_db().await;
        let svc = ClassService::new(db.clone(), ChangeFeed::default());
        let a = svc
            .create_class(CreateClassRequest {
                nama_kelas: " VII  A ".into(),
            })
            .await
            .unwrap();
        assert_eq!(a.nama_kelas, "VII A");
        assert!(matches!(
            svc.create_class(CreateClassRequest {
                nama_kelas: "VII A".into()
            })
            .await,
            Err(AppError::Conflict(_))
        ));

        seed_student(&db, a.id, "1001", "Budi", 7_000).await;
        seed_student(&db, a.id, "1002", "Sari", 3_000).await;
        let list = svc.list_classes().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].jumlah_siswa, 2);
        assert_eq!(list[0].total_saldo, 10_000);

        let renamed = svc
            .update_class(
                a.id,
                UpdateClassRequest {
                    nama_kelas: "VII B".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.nama_kelas, "VII B");
        assert_eq!(renamed.jumlah_siswa, 2);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = memory_db().await;
        let feed = ChangeFeed::default();
        let svc = ClassService::new(db.clone(), feed.clone());
        let ledger = TransactionService::new(db.clone(), feed);
        let class = svc
            .create_class(CreateClassRequest {
                nama_kelas: "VIII C".into(),
            })
            .await
            .unwrap();
        let student = seed_student(&db, class.id, "2001", "Andi", 0).await;
        ledger
            .apply(NewTransaction {
                student_id: student.id,
                jenis: TransactionKind::Setor,
                jumlah: 5_000,
                tanggal: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                keterangan: None,
                admin: "admin".into(),
            })
            .await
            .unwrap();

        let summary = svc.delete_class(class.id).await.unwrap();
        assert_eq!(summary.students, 1);
        assert_eq!(summary.transactions, 1);
        assert_eq!(students::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
        assert!(matches!(
            svc.delete_class(class.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
