use crate::entities::TransactionKind;
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::ledger::{LedgerRef, NewTransaction, compute_new_saldo};
use crate::models::{CreateTransactionRequest, SubmitStatus, SubmitTransactionResponse};
use crate::offline::{Connectivity, OfflineQueue};
use crate::utils::sanitize_optional;
use crate::utils::validation::{parse_tanggal, today, validate_transaction};

/// Jalur simpan form transaksi: langsung ke buku besar bila online,
/// ke antrian offline bila database utama tidak terjangkau.
#[derive(Clone)]
pub struct TransactionFormService {
    ledger: LedgerRef,
    queue: OfflineQueue,
    connectivity: Connectivity,
    feed: ChangeFeed,
}

impl TransactionFormService {
    pub fn new(
        ledger: LedgerRef,
        queue: OfflineQueue,
        connectivity: Connectivity,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            ledger,
            queue,
            connectivity,
            feed,
        }
    }

    pub async fn submit(
        &self,
        req: CreateTransactionRequest,
        admin: &str,
    ) -> AppResult<SubmitTransactionResponse> {
        let tanggal = parse_tanggal(&req.tanggal)?;
        let keterangan = sanitize_optional(req.keterangan.as_deref());
        let valid = validate_transaction(req.jenis, req.jumlah, tanggal, keterangan, today())?;

        let tx = NewTransaction {
            student_id: req.student_id,
            jenis: valid.jenis,
            jumlah: valid.jumlah,
            tanggal: valid.tanggal,
            keterangan: valid.keterangan,
            admin: admin.to_string(),
        };

        if !self.connectivity.is_online() {
            return self.enqueue(&tx).await;
        }

        match self.apply_online(&tx).await {
            Ok(resp) => Ok(resp),
            Err(e) if e.is_network() => {
                log::warn!("Ledger unreachable while saving transaction: {e}");
                self.connectivity.set_online(false);
                self.enqueue(&tx).await
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_online(&self, tx: &NewTransaction) -> AppResult<SubmitTransactionResponse> {
        let saldo = self.ledger.current_balance(tx.student_id).await?;
        if tx.jenis == TransactionKind::Tarik && tx.jumlah > saldo {
            return Err(AppError::InsufficientBalance {
                saldo,
                jumlah: tx.jumlah,
            });
        }
        compute_new_saldo(saldo, tx.jenis, tx.jumlah)?;

        let applied = self.ledger.apply(tx.clone()).await?;
        let message = match tx.jenis {
            TransactionKind::Setor => "Setoran berhasil disimpan",
            TransactionKind::Tarik => "Penarikan berhasil disimpan",
        };
        Ok(SubmitTransactionResponse {
            status: SubmitStatus::Applied,
            transaction_id: Some(applied.id),
            offline_id: None,
            saldo_sebelum: Some(applied.saldo_sebelum),
            saldo_setelah: Some(applied.saldo_setelah),
            message: message.to_string(),
        })
    }

    async fn enqueue(&self, tx: &NewTransaction) -> AppResult<SubmitTransactionResponse> {
        let offline_id = self.queue.add_to_queue(tx).await?;
        self.feed.publish_raw(
            ChangeTable::PendingTransactions,
            ChangeAction::Insert,
            Some(offline_id.clone()),
        );
        Ok(SubmitTransactionResponse {
            status: SubmitStatus::Queued,
            transaction_id: None,
            offline_id: Some(offline_id),
            saldo_sebelum: None,
            saldo_setelah: None,
            message: "Transaksi disimpan offline, akan disinkronkan".to_string(),
        })
    }
}
