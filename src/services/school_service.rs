use crate::database::DbPool;
use crate::entities::school_data_entity as school;
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{SchoolDataResponse, UpdateSchoolDataRequest};
use crate::utils::{sanitize_input, sanitize_optional};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

pub const SCHOOL_ROW_ID: i32 = 1;

#[derive(Clone)]
pub struct SchoolService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl SchoolService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn find(&self) -> AppResult<Option<school::Model>> {
        Ok(school::Entity::find_by_id(SCHOOL_ROW_ID)
            .one(&self.pool)
            .await?)
    }

    /// Data sekolah; baris kosong bila belum pernah diisi.
    pub async fn get(&self) -> AppResult<SchoolDataResponse> {
        Ok(match self.find().await? {
            Some(m) => m.into(),
            None => SchoolDataResponse {
                nama_sekolah: String::new(),
                alamat: None,
                telepon: None,
                email: None,
                kepala_sekolah: None,
                updated_at: None,
            },
        })
    }

    pub async fn update(&self, req: UpdateSchoolDataRequest) -> AppResult<SchoolDataResponse> {
        let nama_sekolah = sanitize_input(&req.nama_sekolah);
        if nama_sekolah.is_empty() || nama_sekolah.chars().count() > 200 {
            return Err(AppError::ValidationError(
                "Nama sekolah harus 1-200 karakter".into(),
            ));
        }
        let am = school::ActiveModel {
            id: Set(SCHOOL_ROW_ID),
            nama_sekolah: Set(nama_sekolah),
            alamat: Set(sanitize_optional(req.alamat.as_deref())),
            telepon: Set(sanitize_optional(req.telepon.as_deref())),
            email: Set(sanitize_optional(req.email.as_deref())),
            kepala_sekolah: Set(sanitize_optional(req.kepala_sekolah.as_deref())),
            updated_at: Set(Utc::now()),
        };
        let model = if self.find().await?.is_some() {
            am.update(&self.pool).await?
        } else {
            am.insert(&self.pool).await?
        };

        self.feed
            .publish_raw(ChangeTable::SchoolData, ChangeAction::Update, None);
        Ok(model.into())
    }
}
