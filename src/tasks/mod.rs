//! Tugas latar belakang.
//!
//! `spawn_all` dipanggil sekali saat startup. Tiap tugas berjalan di loop
//! `tokio::spawn` sendiri dan tidak memblokir pemanggil.

use crate::config::{ReportConfig, SyncConfig};
use crate::database::DbPool;
use crate::offline::Connectivity;
use crate::services::report_service::next_run_after;
use crate::services::{ReportService, StudentPortalService, SyncService, SyncTrigger};
use crate::utils::validation::today;
use chrono::Local;
use std::time::Duration;

const SESSION_PRUNE_SECS: u64 = 600;

pub struct Tasks {
    pub pool: DbPool,
    pub connectivity: Connectivity,
    pub sync: SyncService,
    pub portal: StudentPortalService,
    pub report: ReportService,
    pub sync_config: SyncConfig,
    pub report_config: ReportConfig,
}

/// Satu kali cek koneksi ke database utama. Saat koneksi kembali, antrian
/// offline langsung disinkronkan.
pub async fn probe_once(pool: &DbPool, connectivity: &Connectivity, sync: &SyncService) -> bool {
    let online = match pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Main database ping failed: {e}");
            false
        }
    };
    if connectivity.set_online(online) && online {
        match sync.sync_all_pending(SyncTrigger::Automatic).await {
            Ok(report) => log::info!(
                "Reconnect sync finished: {} success, {} failed, {} skipped",
                report.success,
                report.failed,
                report.skipped
            ),
            Err(e) => log::error!("Reconnect sync failed: {e}"),
        }
    }
    online
}

pub fn spawn_all(tasks: Tasks) {
    let Tasks {
        pool,
        connectivity,
        sync,
        portal,
        report,
        sync_config,
        report_config,
    } = tasks;

    // monitor koneksi
    {
        let sync = sync.clone();
        let interval = Duration::from_secs(sync_config.probe_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                probe_once(&pool, &connectivity, &sync).await;
                tokio::time::sleep(interval).await;
            }
        });
    }

    // coba ulang entri yang gagal; jadwal backoff dicek di sync_all_pending
    {
        let sync = sync.clone();
        let interval = Duration::from_secs(sync_config.retry_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match sync.queue().get_pending_count().await {
                    Ok(0) => continue,
                    Ok(_) => {}
                    Err(e) => {
                        log::error!("Failed to read offline queue: {e}");
                        continue;
                    }
                }
                match sync.sync_all_pending(SyncTrigger::Automatic).await {
                    Ok(r) if r.success + r.failed > 0 => log::info!(
                        "Periodic sync: {} success, {} failed, {} skipped",
                        r.success,
                        r.failed,
                        r.skipped
                    ),
                    Ok(_) => {}
                    Err(e) => log::error!("Periodic sync failed: {e}"),
                }
            }
        });
    }

    // sesi siswa kedaluwarsa
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(SESSION_PRUNE_SECS)).await;
            match portal.purge_expired().await {
                Ok(n) if n > 0 => log::info!("Removed {n} expired student sessions"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to purge student sessions: {e}"),
            }
        }
    });

    // laporan harian WhatsApp
    if report_config.enabled {
        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = match next_run_after(now, &report_config.send_time) {
                    Ok(next) => next,
                    Err(e) => {
                        log::error!("Daily report disabled: {e}");
                        return;
                    }
                };
                let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
                log::info!("Next daily report at {next}");
                tokio::time::sleep(wait).await;

                if let Err(e) = report.send_daily_report(today()).await {
                    log::error!("Daily report failed: {e}");
                }
            }
        });
    }
}
