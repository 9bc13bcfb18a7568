use crate::error::AppError;
use crate::utils::{AuthUser, JwtService};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

// jalur tanpa token staf
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/health",
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
            ],
            // portal siswa memakai token sesinya sendiri
            prefix_paths: vec![
                "/swagger-ui/",
                "/api-docs/",
                "/api/v1/student/",
                "/api/v1/passbook/",
            ],
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self.exact_paths.contains(&path) {
            return true;
        }
        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

/// Memverifikasi JWT auth provider lalu menaruh [`AuthUser`] di extensions.
/// Pemeriksaan peran dilakukan di handler.
pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // preflight CORS
        if req.method() == Method::OPTIONS || self.public_paths.is_public_path(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        // SSE dari EventSource tidak bisa mengirim header
        let token = match token {
            Some(t) => Some(t.to_string()),
            None if req.path() == "/api/v1/admin/events" => req
                .query_string()
                .split('&')
                .find_map(|kv| kv.strip_prefix("access_token="))
                .map(str::to_string),
            None => None,
        };

        let Some(token) = token else {
            let error = AppError::AuthError("Token akses tidak ada".to_string());
            return Box::pin(async move { Err(error.into()) });
        };

        match self.jwt_service.verify_access_token(&token) {
            Ok(user) => {
                req.extensions_mut().insert::<AuthUser>(user);
                Box::pin(self.service.call(req))
            }
            Err(e) => {
                log::warn!("Rejected access token for {}: {e}", req.path());
                let error = AppError::AuthError("Token akses tidak valid".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path("/health"));
        assert!(paths.is_public_path("/swagger-ui/index.html"));
        assert!(paths.is_public_path("/api/v1/student/session"));
        assert!(paths.is_public_path("/api/v1/passbook/verify/1001"));
        assert!(!paths.is_public_path("/api/v1/admin/students"));
        assert!(!paths.is_public_path("/api/v1/wali-kelas/me/students"));
        assert!(!paths.is_public_path("/api/v1/studentx"));
    }
}
