use crate::database::DbPool;
use crate::entities::{Role, profile_entity as profiles};
use crate::error::{AppError, AppResult};
use crate::events::{ChangeAction, ChangeFeed, ChangeTable};
use crate::models::{ProfileResponse, UpsertProfileRequest};
use crate::utils::sanitize_optional;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

/// Peran pengguna admin. Identitas berasal dari JWT auth provider,
/// peran disimpan di tabel `profiles`.
#[derive(Clone)]
pub struct ProfileService {
    pool: DbPool,
    feed: ChangeFeed,
}

impl ProfileService {
    pub fn new(pool: DbPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub async fn get(&self, user_id: Uuid) -> AppResult<Option<profiles::Model>> {
        Ok(profiles::Entity::find_by_id(user_id).one(&self.pool).await?)
    }

    /// Gagal dengan `Forbidden` bila user tidak punya profil atau perannya
    /// tidak termasuk `allowed`.
    pub async fn require_role(&self, user_id: Uuid, allowed: &[Role]) -> AppResult<profiles::Model> {
        match self.get(user_id).await? {
            Some(p) if allowed.contains(&p.role) => Ok(p),
            Some(p) => {
                log::warn!("User {user_id} with role {} denied", p.role);
                Err(AppError::Forbidden)
            }
            None => {
                log::warn!("User {user_id} has no profile");
                Err(AppError::Forbidden)
            }
        }
    }

    pub async fn upsert(&self, req: UpsertProfileRequest) -> AppResult<ProfileResponse> {
        let existing = self.get(req.id).await?;
        let nama = sanitize_optional(req.nama.as_deref());
        let email = sanitize_optional(req.email.as_deref());
        let model = match existing {
            Some(m) => {
                let mut am: profiles::ActiveModel = m.into();
                am.role = Set(req.role);
                am.nama = Set(nama);
                am.email = Set(email);
                am.update(&self.pool).await?
            }
            None => {
                profiles::ActiveModel {
                    id: Set(req.id),
                    role: Set(req.role),
                    nama: Set(nama),
                    email: Set(email),
                    created_at: Set(Utc::now()),
                }
                .insert(&self.pool)
                .await?
            }
        };
        log::info!("Profile {} set to role {}", model.id, model.role);
        self.feed
            .publish(ChangeTable::Profiles, ChangeAction::Update, Some(model.id));
        Ok(model.into())
    }

    pub async fn list(&self) -> AppResult<Vec<ProfileResponse>> {
        Ok(profiles::Entity::find()
            .order_by_asc(profiles::Column::CreatedAt)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
