use crate::entities::{Role, profile_entity as profiles};
use crate::error::{AppError, AppResult};
use crate::offline::Connectivity;
use crate::services::ProfileService;
use crate::utils::AuthUser;
use actix_web::{HttpMessage, HttpRequest};

/// User yang sudah diverifikasi oleh `AuthMiddleware`.
pub fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Token akses tidak ada".into()))
}

pub async fn require_role(
    req: &HttpRequest,
    profiles: &ProfileService,
    allowed: &[Role],
) -> AppResult<profiles::Model> {
    let user = current_user(req)?;
    profiles.require_role(user.user_id, allowed).await
}

pub async fn require_admin(
    req: &HttpRequest,
    profiles: &ProfileService,
) -> AppResult<profiles::Model> {
    require_role(req, profiles, &[Role::Admin]).await
}

/// Admin untuk endpoint yang harus tetap jalan saat database utama mati.
/// Selama online peran dicek di `profiles`; bila tabel itu tidak terjangkau,
/// peran admin harus ada di token. Mengembalikan label petugas.
pub async fn require_admin_tolerant(
    req: &HttpRequest,
    profiles: &ProfileService,
    connectivity: &Connectivity,
) -> AppResult<String> {
    if connectivity.is_online() {
        match require_admin(req, profiles).await {
            Ok(p) => return Ok(staff_label(&p)),
            Err(e) if e.is_network() => {
                log::warn!("Profile lookup unreachable, using token role: {e}");
            }
            Err(e) => return Err(e),
        }
    }
    let user = current_user(req)?;
    if user.token_role != Some(Role::Admin) {
        log::warn!("User {} denied while offline: token has no admin role", user.user_id);
        return Err(AppError::Forbidden);
    }
    Ok(user.user_id.to_string())
}

/// Nama yang dicatat di kolom `admin` transaksi.
pub fn staff_label(profile: &profiles::Model) -> String {
    profile
        .nama
        .clone()
        .or_else(|| profile.email.clone())
        .unwrap_or_else(|| profile.id.to_string())
}

/// Kunci rate limit per klien.
pub fn client_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
