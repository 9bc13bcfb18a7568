use crate::config::SyncConfig;
use crate::entities::pending_transaction_entity as pending;
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::ledger::{AppliedTransaction, LedgerRef, NewTransaction, compute_new_saldo};
use crate::offline::{Connectivity, OfflineQueue};
use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// tombol sinkronkan; jadwal backoff diabaikan
    Manual,
    /// koneksi pulih atau timer berkala
    Automatic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SyncReport {
    fn merge(mut self, other: SyncReport) -> Self {
        self.success += other.success;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self
    }
}

/// Mengirim isi antrian offline ke buku besar.
#[derive(Clone)]
pub struct SyncService {
    ledger: LedgerRef,
    queue: OfflineQueue,
    connectivity: Connectivity,
    feed: ChangeFeed,
    config: SyncConfig,
    running: Arc<Mutex<()>>,
}

impl SyncService {
    pub fn new(
        ledger: LedgerRef,
        queue: OfflineQueue,
        connectivity: Connectivity,
        feed: ChangeFeed,
        config: SyncConfig,
    ) -> Self {
        Self {
            ledger,
            queue,
            connectivity,
            feed,
            config,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn max_retries(&self) -> i32 {
        self.config.max_retries
    }

    /// Jeda sebelum percobaan ke-`attempt` (mulai dari 1).
    pub fn backoff_delay(&self, attempt: i32) -> Duration {
        let exp = attempt.clamp(1, 20) - 1;
        let secs = self
            .config
            .backoff_base_secs
            .saturating_mul(1_i64 << exp)
            .min(self.config.backoff_max_secs);
        Duration::seconds(secs)
    }

    /// Mengirim satu entri. `Ok(true)` bila tercatat dan dihapus dari
    /// antrian, `Ok(false)` bila gagal dan entri ditandai `failed`.
    pub async fn sync_transaction(&self, entry: &pending::Model) -> AppResult<bool> {
        self.queue.mark_syncing(&entry.id).await?;

        match self.try_apply(entry).await {
            Ok(applied) => {
                self.queue.remove(&entry.id).await?;
                log::info!(
                    "Synced offline transaction {} as {} (saldo {} -> {})",
                    entry.id,
                    applied.id,
                    applied.saldo_sebelum,
                    applied.saldo_setelah
                );
                self.feed.publish_raw(
                    ChangeTable::PendingTransactions,
                    ChangeAction::Delete,
                    Some(entry.id.clone()),
                );
                Ok(true)
            }
            Err(e) => {
                if e.is_network() {
                    self.connectivity.set_online(false);
                }
                let attempt = entry.retry_count + 1;
                let next_attempt_at = Utc::now() + self.backoff_delay(attempt);
                log::warn!(
                    "Failed to sync offline transaction {} (attempt {attempt}): {e}",
                    entry.id
                );
                self.queue
                    .mark_failed(&entry.id, &e.to_string(), Some(next_attempt_at))
                    .await?;
                Ok(false)
            }
        }
    }

    async fn try_apply(&self, entry: &pending::Model) -> AppResult<AppliedTransaction> {
        // saldo diambil saat sinkronisasi, bukan saat entri dibuat
        let current = self.ledger.current_balance(entry.student_id).await?;
        compute_new_saldo(current, entry.jenis, entry.jumlah)?;
        self.ledger
            .apply(NewTransaction {
                student_id: entry.student_id,
                jenis: entry.jenis,
                jumlah: entry.jumlah,
                tanggal: entry.tanggal,
                keterangan: entry.keterangan.clone(),
                admin: entry.admin.clone(),
            })
            .await
    }

    /// Mengirim semua entri yang masih boleh dicoba.
    ///
    /// Entri satu siswa diproses berurutan sesuai waktu masuk; bila satu
    /// gagal, entri berikutnya milik siswa itu menunggu run berikutnya.
    /// Siswa yang berbeda diproses paralel sampai `max_concurrency`.
    pub async fn sync_all_pending(&self, trigger: SyncTrigger) -> AppResult<SyncReport> {
        let _guard = match trigger {
            SyncTrigger::Manual => self.running.lock().await,
            SyncTrigger::Automatic => match self.running.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    log::debug!("Offline sync already running, skipping automatic trigger");
                    return Ok(SyncReport::default());
                }
            },
        };

        if !self.connectivity.is_online() {
            return match trigger {
                SyncTrigger::Manual => Err(AppError::Offline(
                    "Database utama tidak terjangkau".into(),
                )),
                SyncTrigger::Automatic => Ok(SyncReport::default()),
            };
        }

        let entries = self.queue.get_pending_transactions().await?;
        if entries.is_empty() {
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport::default();
        let mut order: Vec<Uuid> = Vec::new();
        let mut groups: HashMap<Uuid, Vec<pending::Model>> = HashMap::new();
        for entry in entries {
            // entri yang sudah habis jatah percobaan tidak ikut dan tidak menahan entri lain
            if entry.retry_count >= self.config.max_retries {
                report.skipped += 1;
                continue;
            }
            let student_id = entry.student_id;
            groups
                .entry(student_id)
                .or_insert_with(|| {
                    order.push(student_id);
                    Vec::new()
                })
                .push(entry);
        }

        let now = Utc::now();
        let batches: Vec<Vec<pending::Model>> = order
            .into_iter()
            .filter_map(|student_id| groups.remove(&student_id))
            .collect();
        let results: Vec<SyncReport> = stream::iter(batches)
            .map(|group| self.sync_group(group, trigger, now))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        let report = results.into_iter().fold(report, SyncReport::merge);

        log::info!(
            "Offline sync finished ({trigger:?}): {} synced, {} failed, {} skipped",
            report.success,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    async fn sync_group(
        &self,
        group: Vec<pending::Model>,
        trigger: SyncTrigger,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut remaining = group.into_iter();
        while let Some(entry) = remaining.next() {
            let deferred = trigger == SyncTrigger::Automatic
                && entry.next_attempt_at.is_some_and(|at| at > now);
            if deferred || !self.connectivity.is_online() {
                report.skipped += 1 + remaining.len();
                break;
            }
            match self.sync_transaction(&entry).await {
                Ok(true) => report.success += 1,
                Ok(false) => {
                    report.failed += 1;
                    report.skipped += remaining.len();
                    break;
                }
                Err(e) => {
                    log::error!("Offline queue error while syncing {}: {e}", entry.id);
                    report.failed += 1;
                    report.skipped += remaining.len();
                    break;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbPool;
    use crate::database::test_support::{memory_db, seed_class, seed_student};
    use crate::entities::{PendingStatus, TransactionKind, transaction_entity as transactions};
    use crate::ledger::Ledger;
    use crate::offline::queue::test_support::memory_queue;
    use crate::services::TransactionService;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pending_tx(student_id: Uuid, jenis: TransactionKind, jumlah: i64) -> NewTransaction {
        NewTransaction {
            student_id,
            jenis,
            jumlah,
            tanggal: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            keterangan: None,
            admin: "admin".into(),
        }
    }

    fn service(ledger: LedgerRef, queue: OfflineQueue) -> SyncService {
        SyncService::new(
            ledger,
            queue,
            Connectivity::default(),
            ChangeFeed::default(),
            SyncConfig::default(),
        )
    }

    async fn real_setup(saldo: i64) -> (SyncService, DbPool, Uuid) {
        let db = memory_db().await;
        let class = seed_class(&db, "IX C").await;
        let student = seed_student(&db, class.id, "3003", "Rina", saldo).await;
        let ledger: LedgerRef = Arc::new(TransactionService::new(db.clone(), ChangeFeed::default()));
        (service(ledger, memory_queue().await), db, student.id)
    }

    async fn row_count(db: &DbPool) -> u64 {
        transactions::Entity::find().count(db).await.unwrap()
    }

    /// Buku besar yang selalu gagal.
    struct BrokenLedger {
        applies: AtomicUsize,
    }

    #[async_trait]
    impl Ledger for BrokenLedger {
        async fn current_balance(&self, _student_id: Uuid) -> AppResult<i64> {
            Ok(1_000_000)
        }

        async fn apply(&self, _tx: NewTransaction) -> AppResult<AppliedTransaction> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InternalError("induced failure".into()))
        }
    }

    #[tokio::test]
    async fn test_sync_removes_entry_and_writes_one_row() {
        let (svc, db, sid) = real_setup(0).await;
        svc.queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Setor, 15_000))
            .await
            .unwrap();

        let report = svc.sync_all_pending(SyncTrigger::Automatic).await.unwrap();
        assert_eq!(report, SyncReport { success: 1, failed: 0, skipped: 0 });
        assert_eq!(svc.queue().get_pending_count().await.unwrap(), 0);
        assert_eq!(row_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_withdrawal_above_sync_time_balance_fails() {
        let (svc, db, sid) = real_setup(5_000).await;
        let id = svc
            .queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Tarik, 8_000))
            .await
            .unwrap();

        let report = svc.sync_all_pending(SyncTrigger::Manual).await.unwrap();
        assert_eq!(report.failed, 1);

        let entry = svc.queue().get(&id).await.unwrap().unwrap();
        assert_eq!(entry.status, PendingStatus::Failed);
        assert_eq!(entry.retry_count, 1);
        assert!(entry.next_attempt_at.is_some());
        assert_eq!(row_count(&db).await, 0);
        let ledger = TransactionService::new(db.clone(), ChangeFeed::default());
        assert_eq!(ledger.current_balance(sid).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_entry_excluded_after_max_retries() {
        let broken = Arc::new(BrokenLedger {
            applies: AtomicUsize::new(0),
        });
        let svc = service(broken.clone(), memory_queue().await);
        let id = svc
            .queue()
            .add_to_queue(&pending_tx(Uuid::new_v4(), TransactionKind::Setor, 5_000))
            .await
            .unwrap();

        for _ in 0..3 {
            let report = svc.sync_all_pending(SyncTrigger::Manual).await.unwrap();
            assert_eq!(report.failed, 1);
        }
        let entry = svc.queue().get(&id).await.unwrap().unwrap();
        assert!(entry.retry_count >= 3);

        let report = svc.sync_all_pending(SyncTrigger::Manual).await.unwrap();
        assert_eq!(report, SyncReport { success: 0, failed: 0, skipped: 1 });
        assert_eq!(broken.applies.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_automatic_trigger_respects_backoff() {
        let broken = Arc::new(BrokenLedger {
            applies: AtomicUsize::new(0),
        });
        let svc = service(broken.clone(), memory_queue().await);
        svc.queue()
            .add_to_queue(&pending_tx(Uuid::new_v4(), TransactionKind::Setor, 5_000))
            .await
            .unwrap();

        assert_eq!(svc.sync_all_pending(SyncTrigger::Automatic).await.unwrap().failed, 1);
        let report = svc.sync_all_pending(SyncTrigger::Automatic).await.unwrap();
        assert_eq!(report, SyncReport { success: 0, failed: 0, skipped: 1 });
        assert_eq!(broken.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_later_entries_of_student_wait_for_earlier_failure() {
        let (svc, db, sid) = real_setup(0).await;
        svc.queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Tarik, 5_000))
            .await
            .unwrap();
        svc.queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Setor, 10_000))
            .await
            .unwrap();

        let report = svc.sync_all_pending(SyncTrigger::Manual).await.unwrap();
        assert_eq!(report, SyncReport { success: 0, failed: 1, skipped: 1 });
        assert_eq!(row_count(&db).await, 0);
        assert_eq!(svc.queue().get_pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_many_students_sync_in_order() {
        let db = memory_db().await;
        let class = seed_class(&db, "X IPA").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(seed_student(&db, class.id, &format!("500{i}"), "Siswa", 0).await.id);
        }
        let ledger = Arc::new(TransactionService::new(db.clone(), ChangeFeed::default()));
        let svc = service(ledger.clone(), memory_queue().await);
        for sid in &ids {
            // setor dulu lalu tarik: urutan harus terjaga agar tarik lolos
            svc.queue()
                .add_to_queue(&pending_tx(*sid, TransactionKind::Setor, 20_000))
                .await
                .unwrap();
            svc.queue()
                .add_to_queue(&pending_tx(*sid, TransactionKind::Tarik, 15_000))
                .await
                .unwrap();
        }

        let report = svc.sync_all_pending(SyncTrigger::Manual).await.unwrap();
        assert_eq!(report.success, 10);
        for sid in ids {
            assert_eq!(ledger.current_balance(sid).await.unwrap(), 5_000);
        }
    }

    #[tokio::test]
    async fn test_leftover_syncing_entry_is_retried() {
        let (svc, _db, sid) = real_setup(0).await;
        let id = svc
            .queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Setor, 5_000))
            .await
            .unwrap();
        svc.queue().mark_syncing(&id).await.unwrap();

        let report = svc.sync_all_pending(SyncTrigger::Automatic).await.unwrap();
        assert_eq!(report.success, 1);
    }

    #[tokio::test]
    async fn test_manual_trigger_while_offline() {
        let (svc, _db, sid) = real_setup(0).await;
        svc.queue()
            .add_to_queue(&pending_tx(sid, TransactionKind::Setor, 5_000))
            .await
            .unwrap();
        svc.connectivity.set_online(false);
        assert!(matches!(
            svc.sync_all_pending(SyncTrigger::Manual).await,
            Err(AppError::Offline(_))
        ));
        assert_eq!(
            svc.sync_all_pending(SyncTrigger::Automatic).await.unwrap(),
            SyncReport::default()
        );
    }

    #[tokio::test]
    async fn test_backoff_is_capped() {
        let ledger: LedgerRef = Arc::new(BrokenLedger {
            applies: AtomicUsize::new(0),
        });
        let svc = service(ledger, memory_queue().await);
        assert_eq!(svc.backoff_delay(1), Duration::seconds(30));
        assert_eq!(svc.backoff_delay(3), Duration::seconds(120));
        assert_eq!(svc.backoff_delay(12), Duration::seconds(1800));
    }
}
