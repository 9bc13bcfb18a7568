use crate::entities::Role;
use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Klaim token dari auth provider. Token diterbitkan di luar aplikasi ini;
/// di sini hanya diverifikasi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<AppMetadata>,
    pub exp: i64,
}

/// Metadata yang diisi auth provider; `role` di sini adalah peran aplikasi.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    /// Peran aplikasi dari token. `app_metadata.role` didahulukan karena
    /// klaim `role` biasanya hanya `authenticated`.
    pub fn app_role(&self) -> Option<Role> {
        self.app_metadata
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .and_then(Role::parse)
            .or_else(|| self.role.as_deref().and_then(Role::parse))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Peran dari token, dipakai hanya saat tabel `profiles` tidak terjangkau.
    pub token_role: Option<Role>,
}

#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // token auth provider membawa aud "authenticated"
        validation.validate_aud = false;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.verify_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("Invalid subject in access token".to_string()))?;
        Ok(AuthUser {
            user_id,
            token_role: claims.app_role(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn sign(secret: &str, sub: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: None,
            role: Some("authenticated".into()),
            app_metadata: None,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_access_token() {
        let service = JwtService::new("rahasia");
        let user_id = Uuid::new_v4();
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = sign("rahasia", &user_id.to_string(), exp);
        assert_eq!(service.verify_access_token(&token).unwrap().user_id, user_id);

        let wrong_secret = sign("lain", &user_id.to_string(), exp);
        assert!(service.verify_access_token(&wrong_secret).is_err());

        let bad_sub = sign("rahasia", "bukan-uuid", exp);
        assert!(matches!(
            service.verify_access_token(&bad_sub),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new("rahasia");
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = sign("rahasia", &Uuid::new_v4().to_string(), exp);
        assert!(service.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_app_role_from_metadata() {
        let service = JwtService::new("rahasia");
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: None,
            role: Some("authenticated".into()),
            app_metadata: Some(AppMetadata {
                role: Some("admin".into()),
            }),
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("rahasia".as_bytes()),
        )
        .unwrap();
        let user = service.verify_access_token(&token).unwrap();
        assert_eq!(user.token_role, Some(Role::Admin));

        // klaim `role` standar bukan peran aplikasi
        let plain = sign("rahasia", &Uuid::new_v4().to_string(), exp);
        assert_eq!(service.verify_access_token(&plain).unwrap().token_role, None);
    }
}
