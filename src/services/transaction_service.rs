use crate::database::DbPool;
use crate::entities::{class_entity as classes, student_entity as students, transaction_entity as transactions};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::ledger::{
    AppliedTransaction, Ledger, NewTransaction, ReplayEntry, compute_new_saldo, net_effect, replay,
};
use crate::models::{
    PaginatedResponse, PaginationParams, RecalculateResponse, TransactionQuery,
    TransactionResponse, UpdateTransactionRequest,
};
use crate::utils::sanitize_optional;
use crate::utils::validation::{parse_tanggal, today, validate_transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Buku besar tabungan di atas database utama.
#[derive(Clone)]
pub struct TransactionService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl TransactionService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn get_transaction(&self, id: Uuid) -> AppResult<TransactionResponse> {
        let model = transactions::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".into()))?;
        let mut list = with_display_fields(&self.pool, vec![model]).await?;
        list.pop()
            .ok_or_else(|| AppError::InternalError("Transaction lookup lost row".into()))
    }

    /// Daftar transaksi terbaru lebih dulu, dengan NIS, nama dan kelas.
    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);

        let base = filtered(query);
        let total = base.clone().count(&self.pool).await?;
        let rows = base
            .order_by_desc(transactions::Column::Tanggal)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(params.limit())
            .offset(params.offset())
            .all(&self.pool)
            .await?;

        let data = with_display_fields(&self.pool, rows).await?;
        Ok(PaginatedResponse::new(data, params, total))
    }

    /// Riwayat seorang siswa, terbaru lebih dulu.
    pub async fn student_transactions(
        &self,
        student_id: Uuid,
        limit: Option<u64>,
    ) -> AppResult<Vec<TransactionResponse>> {
        let mut select = transactions::Entity::find()
            .filter(transactions::Column::StudentId.eq(student_id))
            .order_by_desc(transactions::Column::Tanggal)
            .order_by_desc(transactions::Column::CreatedAt);
        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        let rows = select.all(&self.pool).await?;
        with_display_fields(&self.pool, rows).await
    }

    /// Mengubah transaksi yang sudah tercatat. Saldo siswa disesuaikan
    /// dengan selisih efek lama dan baru, lalu snapshot di-replay.
    pub async fn update_transaction(
        &self,
        id: Uuid,
        req: UpdateTransactionRequest,
    ) -> AppResult<TransactionResponse> {
        let txn = self.pool.begin().await?;

        let old = transactions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".into()))?;

        let tanggal = match req.tanggal.as_deref() {
            Some(raw) => parse_tanggal(raw)?,
            None => old.tanggal,
        };
        let keterangan = match req.keterangan.as_deref() {
            Some(raw) => sanitize_optional(Some(raw)),
            None => old.keterangan.clone(),
        };
        let valid = validate_transaction(
            req.jenis.unwrap_or(old.jenis),
            req.jumlah.unwrap_or(old.jumlah),
            tanggal,
            keterangan,
            today(),
        )?;

        let student = lock_student(&txn, old.student_id).await?;
        let delta = valid.jenis.signed(valid.jumlah) - old.jenis.signed(old.jumlah);

        let mut am = old.clone().into_active_model();
        am.jenis = Set(valid.jenis);
        am.jumlah = Set(valid.jumlah);
        am.tanggal = Set(valid.tanggal);
        am.keterangan = Set(valid.keterangan);
        am.update(&txn).await?;

        let Some(new_saldo) = adjust_saldo(&txn, student.id, delta).await? else {
            let current = find_student(&txn, student.id).await?.saldo;
            return Err(AppError::InsufficientBalance {
                saldo: current - old.jenis.signed(old.jumlah),
                jumlah: valid.jumlah,
            });
        };
        resnapshot(&txn, student.id, new_saldo).await?;

        let updated = transactions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".into()))?;
        txn.commit().await?;

        log::info!(
            "Updated transaction {id}: saldo of student {} is now {new_saldo}",
            student.id
        );
        self.feed
            .publish(ChangeTable::Transactions, ChangeAction::Update, Some(id));
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Update, Some(student.id));

        let mut list = with_display_fields(&self.pool, vec![updated]).await?;
        list.pop()
            .ok_or_else(|| AppError::InternalError("Transaction lookup lost row".into()))
    }

    /// Menghapus transaksi dan membatalkan efeknya pada saldo.
    pub async fn delete_transaction(&self, id: Uuid) -> AppResult<i64> {
        let txn = self.pool.begin().await?;

        let old = transactions::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".into()))?;
        let student = lock_student(&txn, old.student_id).await?;

        transactions::Entity::delete_by_id(id).exec(&txn).await?;
        let Some(new_saldo) = adjust_saldo(&txn, student.id, -old.jenis.signed(old.jumlah)).await?
        else {
            return Err(AppError::ValidationError(
                "Transaksi tidak dapat dihapus karena saldo siswa akan menjadi negatif".into(),
            ));
        };
        resnapshot(&txn, student.id, new_saldo).await?;
        txn.commit().await?;

        log::info!(
            "Deleted transaction {id}: saldo of student {} is now {new_saldo}",
            student.id
        );
        self.feed
            .publish(ChangeTable::Transactions, ChangeAction::Delete, Some(id));
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Update, Some(student.id));
        Ok(new_saldo)
    }

    /// Menghitung ulang saldo dan semua snapshot dari riwayat transaksi.
    pub async fn recalculate_student(&self, student_id: Uuid) -> AppResult<RecalculateResponse> {
        let txn = self.pool.begin().await?;
        let student = lock_student(&txn, student_id).await?;

        let rows = load_history(&txn, student_id).await?;
        let (saldo_baru, transaksi_diperbarui) = replay_rows(&txn, rows, 0).await?;
        if saldo_baru != student.saldo {
            log::warn!(
                "Balance drift on student {student_id}: stored {}, history {saldo_baru}",
                student.saldo
            );
            set_saldo(&txn, student_id, saldo_baru).await?;
        }
        txn.commit().await?;

        if saldo_baru != student.saldo || transaksi_diperbarui > 0 {
            self.feed
                .publish(ChangeTable::Students, ChangeAction::Update, Some(student_id));
        }
        Ok(RecalculateResponse {
            student_id,
            saldo_lama: student.saldo,
            saldo_baru,
            transaksi_diperbarui,
        })
    }

    async fn apply_in<C: ConnectionTrait>(
        conn: &C,
        tx: &NewTransaction,
    ) -> AppResult<AppliedTransaction> {
        let student = lock_student(conn, tx.student_id).await?;
        compute_new_saldo(student.saldo, tx.jenis, tx.jumlah)?;

        let delta = tx.jenis.signed(tx.jumlah);
        let now = Utc::now();
        let Some(saldo_setelah) = adjust_saldo(conn, tx.student_id, delta).await? else {
            let current = find_student(conn, tx.student_id).await?.saldo;
            return Err(AppError::InsufficientBalance {
                saldo: current,
                jumlah: tx.jumlah,
            });
        };
        let saldo_sebelum = saldo_setelah - delta;

        let backdated = transactions::Entity::find()
            .filter(transactions::Column::StudentId.eq(tx.student_id))
            .filter(transactions::Column::Tanggal.gt(tx.tanggal))
            .count(conn)
            .await?
            > 0;

        let id = Uuid::now_v7();
        insert_row(conn, id, tx, saldo_setelah, now).await?;
        if backdated {
            resnapshot(conn, tx.student_id, saldo_setelah).await?;
        }

        Ok(AppliedTransaction {
            id,
            student_id: tx.student_id,
            saldo_sebelum,
            saldo_setelah,
        })
    }
}

#[async_trait]
impl Ledger for TransactionService {
    async fn current_balance(&self, student_id: Uuid) -> AppResult<i64> {
        Ok(find_student(&self.pool, student_id).await?.saldo)
    }

    async fn apply(&self, tx: NewTransaction) -> AppResult<AppliedTransaction> {
        let txn = self.pool.begin().await?;
        let applied = Self::apply_in(&txn, &tx).await?;
        txn.commit().await?;

        log::info!(
            "Recorded {} {} for student {}: saldo {} -> {}",
            tx.jenis,
            tx.jumlah,
            tx.student_id,
            applied.saldo_sebelum,
            applied.saldo_setelah
        );
        self.feed
            .publish(ChangeTable::Transactions, ChangeAction::Insert, Some(applied.id));
        self.feed
            .publish(ChangeTable::Students, ChangeAction::Update, Some(tx.student_id));
        Ok(applied)
    }
}

// -----------------------------
// helper bersama (dipakai juga oleh import dan restore)
// -----------------------------

/// Select transaksi sesuai filter siswa, kelas, jenis dan rentang tanggal.
pub(crate) fn filtered(query: &TransactionQuery) -> Select<transactions::Entity> {
    let mut base = transactions::Entity::find();
    if let Some(student_id) = query.student_id {
        base = base.filter(transactions::Column::StudentId.eq(student_id));
    }
    if let Some(kelas_id) = query.kelas_id {
        base = base.filter(
            transactions::Column::StudentId.in_subquery(
                Query::select()
                    .column(students::Column::Id)
                    .from(students::Entity)
                    .and_where(students::Column::KelasId.eq(kelas_id))
                    .to_owned(),
            ),
        );
    }
    if let Some(jenis) = query.jenis {
        base = base.filter(transactions::Column::Jenis.eq(jenis));
    }
    if let Some(start) = query.start_date {
        base = base.filter(transactions::Column::Tanggal.gte(start));
    }
    if let Some(end) = query.end_date {
        base = base.filter(transactions::Column::Tanggal.lte(end));
    }
    base
}

pub(crate) async fn find_student<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
) -> AppResult<students::Model> {
    students::Entity::find_by_id(student_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))
}

/// Membaca siswa dengan `SELECT ... FOR UPDATE` sehingga penulis lain
/// menunggu sampai transaksi ini selesai. SQLite mengabaikan klausa kunci;
/// penulisan di sana sudah berurutan.
pub(crate) async fn lock_student<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
) -> AppResult<students::Model> {
    students::Entity::find_by_id(student_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Siswa tidak ditemukan".into()))
}

/// `saldo = saldo + delta` dengan syarat hasilnya tidak negatif. `None`
/// bila syarat gagal; saldo baru bila berhasil.
pub(crate) async fn adjust_saldo<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    delta: i64,
) -> AppResult<Option<i64>> {
    let res = students::Entity::update_many()
        .col_expr(
            students::Column::Saldo,
            Expr::col(students::Column::Saldo).add(delta),
        )
        .col_expr(students::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(students::Column::Id.eq(student_id))
        .filter(students::Column::Saldo.gte(-delta))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Ok(None);
    }
    Ok(Some(find_student(conn, student_id).await?.saldo))
}

pub(crate) async fn set_saldo<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    saldo: i64,
) -> AppResult<()> {
    students::Entity::update_many()
        .col_expr(students::Column::Saldo, Expr::value(saldo))
        .col_expr(students::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(students::Column::Id.eq(student_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_row<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    tx: &NewTransaction,
    saldo_setelah: i64,
    created_at: DateTime<Utc>,
) -> AppResult<()> {
    transactions::ActiveModel {
        id: Set(id),
        student_id: Set(tx.student_id),
        jenis: Set(tx.jenis),
        jumlah: Set(tx.jumlah),
        tanggal: Set(tx.tanggal),
        saldo_setelah: Set(saldo_setelah),
        keterangan: Set(tx.keterangan.clone()),
        admin: Set(tx.admin.clone()),
        created_at: Set(created_at),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn load_history<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
) -> AppResult<Vec<transactions::Model>> {
    Ok(transactions::Entity::find()
        .filter(transactions::Column::StudentId.eq(student_id))
        .all(conn)
        .await?)
}

/// Replay riwayat siswa sehingga transaksi terakhir berakhir di `final_saldo`.
pub(crate) async fn resnapshot<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    final_saldo: i64,
) -> AppResult<u64> {
    let rows = load_history(conn, student_id).await?;
    let opening = final_saldo - net_effect(rows.iter().map(|r| (r.jenis, r.jumlah)));
    let (_, updated) = replay_rows(conn, rows, opening).await?;
    Ok(updated)
}

/// Menulis ulang `saldo_setelah` yang berubah. Mengembalikan saldo akhir
/// dan jumlah baris yang diperbarui.
async fn replay_rows<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<transactions::Model>,
    opening: i64,
) -> AppResult<(i64, u64)> {
    let before: HashMap<Uuid, i64> = rows.iter().map(|r| (r.id, r.saldo_setelah)).collect();
    let mut entries: Vec<ReplayEntry> = rows
        .into_iter()
        .map(|r| ReplayEntry {
            id: r.id,
            jenis: r.jenis,
            jumlah: r.jumlah,
            tanggal: r.tanggal,
            created_at: r.created_at,
            saldo_setelah: r.saldo_setelah,
        })
        .collect();
    let end = replay(opening, &mut entries);

    let mut updated = 0;
    for entry in &entries {
        if before.get(&entry.id) == Some(&entry.saldo_setelah) {
            continue;
        }
        transactions::Entity::update_many()
            .col_expr(
                transactions::Column::SaldoSetelah,
                Expr::value(entry.saldo_setelah),
            )
            .filter(transactions::Column::Id.eq(entry.id))
            .exec(conn)
            .await?;
        updated += 1;
    }
    Ok((end, updated))
}

pub(crate) async fn class_names<C: ConnectionTrait>(
    conn: &C,
    ids: HashSet<Uuid>,
) -> AppResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let list = classes::Entity::find()
        .filter(classes::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(list.into_iter().map(|c| (c.id, c.nama_kelas)).collect())
}

/// Menambahkan NIS, nama siswa dan nama kelas ke setiap transaksi.
pub async fn with_display_fields<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<transactions::Model>,
) -> AppResult<Vec<TransactionResponse>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let student_ids: HashSet<Uuid> = rows.iter().map(|r| r.student_id).collect();
    let student_list = students::Entity::find()
        .filter(students::Column::Id.is_in(student_ids))
        .all(conn)
        .await?;
    let names = class_names(conn, student_list.iter().map(|s| s.kelas_id).collect()).await?;
    let by_id: HashMap<Uuid, students::Model> =
        student_list.into_iter().map(|s| (s.id, s)).collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let student = by_id.get(&row.student_id);
            TransactionResponse::from_model(
                row,
                student.map(|s| s.nis.clone()),
                student.map(|s| s.nama.clone()),
                student.and_then(|s| names.get(&s.kelas_id).cloned()),
            )
        })
        .collect())
}
