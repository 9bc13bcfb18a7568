use crate::config::OfflineConfig;
use crate::database::{DbPool, connect};
use crate::entities::{PendingStatus, pending_transaction_entity as pending};
use crate::error::AppResult;
use crate::ledger::NewTransaction;
use crate::utils::generate_offline_id;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Index};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Schema, Set,
};

/// Antrian lokal untuk transaksi yang belum bisa dicatat ke database utama.
#[derive(Clone)]
pub struct OfflineQueue {
    db: DbPool,
}

impl OfflineQueue {
    pub async fn connect(config: &OfflineConfig) -> AppResult<Self> {
        let db = connect(&config.url, 1).await?;
        Self::init(db).await
    }

    /// Membuat tabel dan indeks bila belum ada.
    pub async fn init(db: DbPool) -> AppResult<Self> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        let mut create = schema.create_table_from_entity(pending::Entity);
        create.if_not_exists();
        db.execute(backend.build(&create)).await?;

        let status_index = Index::create()
            .if_not_exists()
            .name("idx_pending_transactions_status")
            .table(pending::Entity)
            .col(pending::Column::Status)
            .to_owned();
        db.execute(backend.build(&status_index)).await?;

        let created_index = Index::create()
            .if_not_exists()
            .name("idx_pending_transactions_created_at")
            .table(pending::Entity)
            .col(pending::Column::CreatedAt)
            .to_owned();
        db.execute(backend.build(&created_index)).await?;

        Ok(Self { db })
    }

    pub async fn add_to_queue(&self, tx: &NewTransaction) -> AppResult<String> {
        let now = Utc::now();
        let id = generate_offline_id(now);
        pending::ActiveModel {
            id: Set(id.clone()),
            student_id: Set(tx.student_id),
            jenis: Set(tx.jenis),
            jumlah: Set(tx.jumlah),
            tanggal: Set(tx.tanggal),
            keterangan: Set(tx.keterangan.clone()),
            admin: Set(tx.admin.clone()),
            created_at: Set(now),
            status: Set(PendingStatus::Pending),
            retry_count: Set(0),
            last_error: Set(None),
            next_attempt_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        log::info!("Queued offline transaction {id} for student {}", tx.student_id);
        Ok(id)
    }

    /// Semua entri apa pun statusnya, urut sesuai waktu masuk.
    pub async fn get_pending_transactions(&self) -> AppResult<Vec<pending::Model>> {
        let list = pending::Entity::find()
            .order_by_asc(pending::Column::CreatedAt)
            .order_by_asc(pending::Column::Id)
            .all(&self.db)
            .await?;
        Ok(list)
    }

    pub async fn get_pending_count(&self) -> AppResult<u64> {
        Ok(pending::Entity::find().count(&self.db).await?)
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<pending::Model>> {
        Ok(pending::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?)
    }

    pub async fn mark_syncing(&self, id: &str) -> AppResult<()> {
        pending::Entity::update_many()
            .col_expr(pending::Column::Status, Expr::value(PendingStatus::Syncing))
            .filter(pending::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Menandai gagal dan menaikkan `retry_count`.
    pub async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        pending::Entity::update_many()
            .col_expr(pending::Column::Status, Expr::value(PendingStatus::Failed))
            .col_expr(
                pending::Column::RetryCount,
                Expr::col(pending::Column::RetryCount).add(1),
            )
            .col_expr(pending::Column::LastError, Expr::value(error.to_string()))
            .col_expr(pending::Column::NextAttemptAt, Expr::value(next_attempt_at))
            .filter(pending::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> AppResult<bool> {
        let res = pending::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Menghapus entri yang sudah melewati batas percobaan.
    pub async fn purge_abandoned(&self, max_retries: i32) -> AppResult<u64> {
        let res = pending::Entity::delete_many()
            .filter(pending::Column::RetryCount.gte(max_retries))
            .exec(&self.db)
            .await?;
        if res.rows_affected > 0 {
            log::warn!("Purged {} abandoned offline transactions", res.rows_affected);
        }
        Ok(res.rows_affected)
    }
}
