use crate::database::DbPool;
use crate::entities::{
    class_entity as classes, student_entity as students, wali_kelas_entity as wali_kelas,
};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{AssignWaliKelasRequest, StudentResponse, WaliKelasResponse, WaliKelasRoster};
use crate::utils::sanitize_input;
use crate::utils::validation::validate_nama;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct WaliKelasService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl WaliKelasService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    /// Satu user hanya menjadi wali satu kelas; penugasan ulang memindahkan.
    pub async fn assign(&self, req: AssignWaliKelasRequest) -> AppResult<WaliKelasResponse> {
        let nama = sanitize_input(&req.nama);
        validate_nama(&nama)?;
        let class = classes::Entity::find_by_id(req.kelas_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Kelas tidak ditemukan".into()))?;

        let existing = wali_kelas::Entity::find()
            .filter(wali_kelas::Column::UserId.eq(req.user_id))
            .one(&self.pool)
            .await?;
        let model = match existing {
            Some(m) => {
                let mut am: wali_kelas::ActiveModel = m.into();
                am.kelas_id = Set(class.id);
                am.nama = Set(nama);
                am.update(&self.pool).await?
            }
            None => {
                wali_kelas::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(req.user_id),
                    kelas_id: Set(class.id),
                    nama: Set(nama),
                    created_at: Set(Utc::now()),
                }
                .insert(&self.pool)
                .await?
            }
        };

        log::info!("Wali kelas {} assigned to {}", model.user_id, class.nama_kelas);
        self.feed
            .publish(ChangeTable::WaliKelas, ChangeAction::Update, Some(model.id));
        Ok(WaliKelasResponse::from_model(model, Some(class.nama_kelas)))
    }

    pub async fn list(&self) -> AppResult<Vec<WaliKelasResponse>> {
        let rows = wali_kelas::Entity::find()
            .order_by_asc(wali_kelas::Column::Nama)
            .all(&self.pool)
            .await?;
        let names: HashMap<Uuid, String> = classes::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|c| (c.id, c.nama_kelas))
            .collect();
        Ok(rows
            .into_iter()
            .map(|m| {
                let nama_kelas = names.get(&m.kelas_id).cloned();
                WaliKelasResponse::from_model(m, nama_kelas)
            })
            .collect())
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        let res = wali_kelas::Entity::delete_by_id(id).exec(&self.pool).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound("Wali kelas tidak ditemukan".into()));
        }
        self.feed
            .publish(ChangeTable::WaliKelas, ChangeAction::Delete, Some(id));
        Ok(())
    }

    /// Daftar siswa di kelas yang diampu `user_id`.
    pub async fn roster(&self, user_id: Uuid) -> AppResult<WaliKelasRoster> {
        let assignment = wali_kelas::Entity::find()
            .filter(wali_kelas::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or(AppError::Forbidden)?;
        let class = classes::Entity::find_by_id(assignment.kelas_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Kelas tidak ditemukan".into()))?;

        let rows = students::Entity::find()
            .filter(students::Column::KelasId.eq(class.id))
            .order_by_asc(students::Column::Nama)
            .all(&self.pool)
            .await?;
        let total_saldo = rows.iter().map(|s| s.saldo).sum();
        let students = rows
            .into_iter()
            .map(|s| StudentResponse::from_model(s, Some(class.nama_kelas.clone())))
            .collect();

        Ok(WaliKelasRoster {
            kelas_id: class.id,
            nama_kelas: class.nama_kelas,
            wali_kelas: assignment.nama,
            students,
            total_saldo,
        })
    }
}
