//! Penjagaan lapisan input: penghitung gagal login dan pembatas laju.
//! Keduanya objek biasa yang dibuat sekali di `main` dan dibagikan lewat
//! `web::Data`, bukan state global.

pub mod login_attempts;
pub mod rate_limit;

pub use login_attempts::LoginAttemptTracker;
pub use rate_limit::RateLimiter;
