use crate::config::StudentPortalConfig;
use crate::database::DbPool;
use crate::entities::{
    class_entity as classes, student_entity as students, student_session_entity as sessions,
    transaction_entity as transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{PassbookVerification, StudentInfo, StudentSessionResponse, TransactionResponse};
use crate::security::{LoginAttemptTracker, RateLimiter};
use crate::services::student_service::find_by_nis;
use crate::services::transaction_service::with_display_fields;
use crate::utils::validation::validate_nis;
use crate::utils::{generate_session_token, sanitize_nis};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: u64 = 50;
const MAX_HISTORY_LIMIT: u64 = 500;

/// Akses siswa tanpa akun: masuk dengan NIS, mendapat token sesi singkat.
#[derive(Clone)]
pub struct StudentPortalService {
    pool: DbPool,
    config: StudentPortalConfig,
    rate_limiter: Arc<RateLimiter>,
    login_attempts: Arc<LoginAttemptTracker>,
}

impl StudentPortalService {
    pub fn new(pool: DbPool, config: StudentPortalConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            std::time::Duration::from_secs(60),
        ));
        let login_attempts = Arc::new(LoginAttemptTracker::new(
            config.max_login_attempts,
            std::time::Duration::from_secs(config.lockout_minutes * 60),
        ));
        Self {
            pool,
            config,
            rate_limiter,
            login_attempts,
        }
    }

    /// `client` adalah alamat peminta; batas percobaan dihitung per klien.
    pub async fn create_session(
        &self,
        raw_nis: &str,
        client: &str,
    ) -> AppResult<StudentSessionResponse> {
        if !self.rate_limiter.check(&format!("session:{client}")) {
            return Err(AppError::TooManyRequests(
                "Terlalu banyak permintaan, coba lagi sebentar lagi".into(),
            ));
        }
        if let Some(wait) = self.login_attempts.locked_for(client) {
            let minutes = wait.as_secs().div_ceil(60).max(1);
            return Err(AppError::TooManyRequests(format!(
                "Terlalu banyak percobaan gagal. Coba lagi dalam {minutes} menit"
            )));
        }

        let nis = sanitize_nis(raw_nis);
        if let Err(e) = validate_nis(&nis) {
            self.login_attempts.record_failure(client);
            return Err(e);
        }
        let Some(student) = find_by_nis(&self.pool, &nis).await? else {
            self.login_attempts.record_failure(client);
            log::warn!("Student session rejected for unknown NIS from {client}");
            return Err(AppError::NotFound("NIS tidak ditemukan".into()));
        };
        self.login_attempts.reset(client);

        let now = Utc::now();
        sessions::Entity::delete_many()
            .filter(sessions::Column::StudentId.eq(student.id))
            .filter(sessions::Column::ExpiresAt.lt(now))
            .exec(&self.pool)
            .await?;

        let token = generate_session_token();
        let expires_at = now + Duration::hours(self.config.session_hours);
        sessions::ActiveModel {
            token: Set(token.clone()),
            student_id: Set(student.id),
            created_at: Set(now),
            expires_at: Set(expires_at),
        }
        .insert(&self.pool)
        .await?;

        log::info!("Student session created for {}", student.nis);
        Ok(StudentSessionResponse {
            token,
            expires_at,
            student: self.student_info(student).await?,
        })
    }

    async fn session_student(&self, token: &str) -> AppResult<students::Model> {
        let session = sessions::Entity::find_by_id(token.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Sesi tidak valid".into()))?;
        if session.expires_at <= Utc::now() {
            sessions::Entity::delete_by_id(session.token)
                .exec(&self.pool)
                .await?;
            return Err(AppError::AuthError("Sesi telah berakhir".into()));
        }
        students::Entity::find_by_id(session.student_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Sesi tidak valid".into()))
    }

    async fn student_info(&self, student: students::Model) -> AppResult<StudentInfo> {
        let nama_kelas = classes::Entity::find_by_id(student.kelas_id)
            .one(&self.pool)
            .await?
            .map(|c| c.nama_kelas);
        Ok(StudentInfo {
            nis: student.nis,
            nama: student.nama,
            nama_kelas,
            saldo: student.saldo,
        })
    }

    pub async fn get_student_info(&self, token: &str) -> AppResult<StudentInfo> {
        let student = self.session_student(token).await?;
        self.student_info(student).await
    }

    pub async fn get_student_transactions(
        &self,
        token: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<TransactionResponse>> {
        let student = self.session_student(token).await?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let rows = transactions::Entity::find()
            .filter(transactions::Column::StudentId.eq(student.id))
            .order_by_desc(transactions::Column::Tanggal)
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .all(&self.pool)
            .await?;
        with_display_fields(&self.pool, rows).await
    }

    pub async fn logout(&self, token: &str) -> AppResult<bool> {
        let res = sessions::Entity::delete_by_id(token.to_string())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// Pemeriksaan QR buku tabungan; siapa pun boleh memanggil.
    pub async fn verify_passbook(
        &self,
        raw_nis: &str,
        client: &str,
    ) -> AppResult<PassbookVerification> {
        if !self.rate_limiter.check(&format!("verify:{client}")) {
            return Err(AppError::TooManyRequests(
                "Terlalu banyak permintaan, coba lagi sebentar lagi".into(),
            ));
        }
        let nis = sanitize_nis(raw_nis);
        validate_nis(&nis)?;
        let student = find_by_nis(&self.pool, &nis)
            .await?
            .ok_or_else(|| AppError::NotFound("Buku tabungan tidak terdaftar".into()))?;

        let history = transactions::Entity::find()
            .filter(transactions::Column::StudentId.eq(student.id));
        let jumlah_transaksi = history.clone().count(&self.pool).await?;
        let transaksi_terakhir = history
            .order_by_desc(transactions::Column::Tanggal)
            .one(&self.pool)
            .await?
            .map(|t| t.tanggal);
        let info = self.student_info(student).await?;

        Ok(PassbookVerification {
            valid: true,
            nis: info.nis,
            nama: info.nama,
            nama_kelas: info.nama_kelas,
            saldo: info.saldo,
            jumlah_transaksi,
            transaksi_terakhir,
        })
    }

    /// Membersihkan sesi kedaluwarsa dan jendela rate limit lama.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        self.rate_limiter.prune();
        self.login_attempts.prune();
        let res = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{memory_db, seed_class, seed_student};

    async fn setup(config: StudentPortalConfig) -> (StudentPortalService, DbPool) {
        let db = memory_db().await;
        let class = seed_class(&db, "VII A").await;
        seed_student(&db, class.id, "1001", "Budi", 12_500).await;
        (StudentPortalService::new(db.clone(), config), db)
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (svc, _db) = setup(StudentPortalConfig::default()).await;
        let session = svc.create_session("1001", "10.0.0.1").await.unwrap();
        assert_eq!(session.token.len(), 48);
        assert_eq!(session.student.saldo, 12_500);
        assert_eq!(session.student.nama_kelas.as_deref(), Some("VII A"));

        let info = svc.get_student_info(&session.token).await.unwrap();
        assert_eq!(info.nis, "1001");
        assert!(svc.get_student_transactions(&session.token, None).await.unwrap().is_empty());

        assert!(svc.logout(&session.token).await.unwrap());
        assert!(matches!(
            svc.get_student_info(&session.token).await,
            Err(AppError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_removed() {
        let (svc, db) = setup(StudentPortalConfig {
            session_hours: -1,
            ..Default::default()
        })
        .await;
        let session = svc.create_session("1001", "10.0.0.1").await.unwrap();
        assert!(matches!(
            svc.get_student_info(&session.token).await,
            Err(AppError::AuthError(_))
        ));
        assert_eq!(sessions::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lockout_after_failed_lookups() {
        let (svc, _db) = setup(StudentPortalConfig {
            max_login_attempts: 3,
            rate_limit_per_minute: 100,
            ..Default::default()
        })
        .await;
        for _ in 0..3 {
            assert!(matches!(
                svc.create_session("9999", "10.0.0.2").await,
                Err(AppError::NotFound(_))
            ));
        }
        assert!(matches!(
            svc.create_session("1001", "10.0.0.2").await,
            Err(AppError::TooManyRequests(_))
        ));
        // klien lain tidak terpengaruh
        assert!(svc.create_session("1001", "10.0.0.3").await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let (svc, _db) = setup(StudentPortalConfig {
            rate_limit_per_minute: 2,
            ..Default::default()
        })
        .await;
        assert!(svc.create_session("1001", "c").await.is_ok());
        assert!(svc.create_session("1001", "c").await.is_ok());
        assert!(matches!(
            svc.create_session("1001", "c").await,
            Err(AppError::TooManyRequests(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_passbook() {
        let (svc, _db) = setup(StudentPortalConfig::default()).await;
        let v = svc.verify_passbook("1001", "c").await.unwrap();
        assert!(v.valid);
        assert_eq!(v.saldo, 12_500);
        assert_eq!(v.jumlah_transaksi, 0);
        assert!(v.transaksi_terakhir.is_none());
        assert!(matches!(
            svc.verify_passbook("4040", "c").await,
            Err(AppError::NotFound(_))
        ));
    }
}
