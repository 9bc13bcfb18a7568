use crate::models::ErrorResponse;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient balance: saldo {saldo}, requested {jumlah}")]
    InsufficientBalance { saldo: i64, jumlah: i64 },

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Backend unreachable: {0}")]
    Offline(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Error yang berasal dari koneksi, bukan dari data. Transaksi dengan
    /// error seperti ini dialihkan ke antrian offline.
    pub fn is_network(&self) -> bool {
        match self {
            AppError::Offline(_) => true,
            AppError::DatabaseError(DbErr::Conn(_)) => true,
            AppError::DatabaseError(DbErr::ConnectionAcquire(_)) => true,
            AppError::ReqwestError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::InsufficientBalance { saldo, jumlah } => {
                log::warn!("Insufficient balance: saldo {saldo}, jumlah {jumlah}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "INSUFFICIENT_BALANCE",
                    format!("Saldo tidak mencukupi. Saldo saat ini Rp {saldo}"),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "CONFLICT",
                    msg.clone(),
                )
            }
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Akses ditolak".to_string(),
                )
            }
            AppError::TooManyRequests(msg) => {
                log::warn!("Rate limited: {msg}");
                (
                    actix_web::http::StatusCode::TOO_MANY_REQUESTS,
                    "TOO_MANY_REQUESTS",
                    msg.clone(),
                )
            }
            AppError::Offline(msg) => {
                log::warn!("Backend unreachable: {msg}");
                (
                    actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                    "OFFLINE",
                    "Server database tidak dapat dihubungi".to_string(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg.clone(),
                )
            }
            AppError::ConfigError(msg) => {
                log::error!("Config error: {msg}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Terjadi kesalahan pada database".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Terjadi kesalahan pada server".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(ErrorResponse::new(error_code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_network_classification() {
        assert!(AppError::Offline("down".into()).is_network());
        assert!(AppError::DatabaseError(DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "refused".into()
        )))
        .is_network());
        assert!(!AppError::ValidationError("x".into()).is_network());
        assert!(!AppError::InsufficientBalance { saldo: 0, jumlah: 1 }.is_network());
        assert!(!AppError::DatabaseError(DbErr::RecordNotFound("x".into())).is_network());
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::InsufficientBalance { saldo: 100, jumlah: 500 }.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = AppError::Offline("down".into()).error_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let resp = AppError::TooManyRequests("slow".into()).error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
