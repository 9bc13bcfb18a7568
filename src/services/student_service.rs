use crate::database::DbPool;
use crate::entities::{
    class_entity as classes, student_entity as students, student_session_entity as sessions,
    transaction_entity as transactions,
};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{
    CreateStudentRequest, PaginatedResponse, PaginationParams, StudentQuery, StudentResponse,
    UpdateStudentRequest,
};
use crate::services::transaction_service::class_names;
use crate::utils::validation::{validate_nama, validate_nis};
use crate::utils::{sanitize_input, sanitize_nis};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct StudentService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl StudentService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn create_student(&self, req: CreateStudentRequest) -> AppResult<StudentResponse> {
        let nis = sanitize_nis(&req.nis);
        let nama = sanitize_input(&req.nama);
        validate_nis(&nis)?;
        validate_nama(&nama)?;
        let class = find_class(&self.pool, req.kelas_id).await?;
        if find_by_nis(&self.pool, &nis).await?.is_some() {
            return Err(AppError::Conflict(format!("NIS {nis} sudah terdaftar")));
        }

        let model = insert_student(&self.pool, &nis, &nama, class.id).await?;
        log::info!("Created student {} ({})", model.nis, model.id);
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Insert, Some(model.id));
        Ok(StudentResponse::from_model(model, Some(class.nama_kelas)))
    }

    pub async fn get_student(&self, id: Uuid) -> AppResult<StudentResponse> {
        let model = students::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))?;
        let nama_kelas = classes::Entity::find_by_id(model.kelas_id)
            .one(&self.pool)
            .await?
            .map(|c| c.nama_kelas);
        Ok(StudentResponse::from_model(model, nama_kelas))
    }

    pub async fn list_students(
        &self,
        query: &StudentQuery,
    ) -> AppResult<PaginatedResponse<StudentResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);

        let mut base = students::Entity::find();
        if let Some(kelas_id) = query.kelas_id {
            base = base.filter(students::Column::KelasId.eq(kelas_id));
        }
        if let Some(search) = query.search.as_deref().map(sanitize_input)
            && !search.is_empty()
        {
            let pattern = format!("%{}%", search.to_lowercase());
            base = base.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(students::Column::Nama))).like(pattern))
                    .add(students::Column::Nis.contains(&search)),
            );
        }

        let total = base.clone().count(&self.pool).await?;
        let rows = base
            .order_by_asc(students::Column::Nama)
            .order_by_asc(students::Column::Nis)
            .limit(params.limit())
            .offset(params.offset())
            .all(&self.pool)
            .await?;

        let data = with_class_names(&self.pool, rows).await?;
        Ok(PaginatedResponse::new(data, params, total))
    }

    pub async fn update_student(
        &self,
        id: Uuid,
        req: UpdateStudentRequest,
    ) -> AppResult<StudentResponse> {
        let model = students::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))?;
        let mut am = model.clone().into_active_model();

        if let Some(raw) = req.nis.as_deref() {
            let nis = sanitize_nis(raw);
            validate_nis(&nis)?;
            if nis != model.nis {
                if find_by_nis(&self.pool, &nis).await?.is_some() {
                    return Err(AppError::Conflict(format!("NIS {nis} sudah terdaftar")));
                }
                am.nis = Set(nis);
            }
        }
        if let Some(raw) = req.nama.as_deref() {
            let nama = sanitize_input(raw);
            validate_nama(&nama)?;
            am.nama = Set(nama);
        }
        let kelas_id = req.kelas_id.unwrap_or(model.kelas_id);
        let class = find_class(&self.pool, kelas_id).await?;
        am.kelas_id = Set(kelas_id);
        am.updated_at = Set(Utc::now());

        let updated = am.update(&self.pool).await?;
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Update, Some(id));
        Ok(StudentResponse::from_model(updated, Some(class.nama_kelas)))
    }

    /// Menghapus siswa beserta transaksi dan sesi portalnya.
    pub async fn delete_student(&self, id: Uuid) -> AppResult<u64> {
        let txn = self.pool.begin().await?;
        students::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))?;

        let removed = transactions::Entity::delete_many()
            .filter(transactions::Column::StudentId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        sessions::Entity::delete_many()
            .filter(sessions::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        students::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::warn!("Deleted student {id} with {removed} transactions");
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Delete, Some(id));
        if removed > 0 {
            self.feed
                .publish(ChangeTable::Transactions, ChangeAction::Delete, None);
        }
        Ok(removed)
    }
}

pub(crate) async fn find_by_nis<C: ConnectionTrait>(
    conn: &C,
    nis: &str,
) -> AppResult<Option<students::Model>> {
    Ok(students::Entity::find()
        .filter(students::Column::Nis.eq(nis))
        .one(conn)
        .await?)
}

async fn find_class<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<classes::Model> {
    classes::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::ValidationError("Kelas tidak ditemukan".into()))
}

pub(crate) async fn insert_student<C: ConnectionTrait>(
    conn: &C,
    nis: &str,
    nama: &str,
    kelas_id: Uuid,
) -> AppResult<students::Model> {
    let now = Utc::now();
    Ok(students::ActiveModel {
        id: Set(Uuid::new_v4()),
        nis: Set(nis.to_string()),
        nama: Set(nama.to_string()),
        kelas_id: Set(kelas_id),
        saldo: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

pub(crate) async fn with_class_names<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<students::Model>,
) -> AppResult<Vec<StudentResponse>> {
    let names = class_names(conn, rows.iter().map(|s| s.kelas_id).collect()).await?;
    Ok(rows
        .into_iter()
        .map(|s| {
            let nama_kelas = names.get(&s.kelas_id).cloned();
            StudentResponse::from_model(s, nama_kelas)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_class};

    fn create(nis: &str, nama: &str, kelas_id: Uuid) -> CreateStudentRequest {
        CreateStudentRequest {
            nis: nis.into(),
            nama: nama.into(),
            kelas_id,
        }
    }

    #[tokio::test]
    async fn test_create_validates_and_rejects_duplicate_nis() {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        let svc = StudentService::new(db, ChangeFeed::default());

        let s = svc.create_student(create("1001", "Budi Santoso", class.id)).await.unwrap();
        assert_eq!(s.saldo, 0);
        assert_eq!(s.nama_kelas.as_deref(), Some("VII A"));

        assert!(matches!(
            svc.create_student(create("1001", "Andi", class.id)).await,
            Err(AppError::Conflict(_))
        ));
        assert!(svc.create_student(create("12", "Andi", class.id)).await.is_err());
        assert!(svc.create_student(create("1003", "A", class.id)).await.is_err());
        assert!(
            svc.create_student(create("1004", "Andi", Uuid::new_v4()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_search_and_pagination() {
        let db = memory_db().await;
        let a = seed_class(&db, "VII A").await;
        let b = seed_class(&db, "VII B").await;
        let svc = StudentService::new(db, ChangeFeed::default());
        svc.create_student(create("1001", "Budi", a.id)).await.unwrap();
        svc.create_student(create("1002", "budiman", b.id)).await.unwrap();
        svc.create_student(create("2001", "Sari", a.id)).await.unwrap();

        let found = svc
            .list_students(&StudentQuery {
                search: Some("BUDI".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 2);

        let by_nis = svc
            .list_students(&StudentQuery {
                search: Some("200".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_nis.data[0].nama, "Sari");

        let page = svc
            .list_students(&StudentQuery {
                kelas_id: Some(a.id),
                page: Some(2),
                page_size: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].nama, "Sari");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = memory_db().await;
        let a = seed_class(&db, "VII A").await;
        let b = seed_class(&db, "VII B").await;
        let svc = StudentService::new(db, ChangeFeed::default());
        let s = svc.create_student(create("1001", "Budi", a.id)).await.unwrap();

        let moved = svc
            .update_student(
                s.id,
                UpdateStudentRequest {
                    nama: Some("Budi Utomo".into()),
                    kelas_id: Some(b.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.nama, "Budi Utomo");
        assert_eq!(moved.nama_kelas.as_deref(), Some("VII B"));

        assert_eq!(svc.delete_student(s.id).await.unwrap(), 0);
        assert!(matches!(svc.get_student(s.id).await, Err(AppError::NotFound(_))));
    }
}
