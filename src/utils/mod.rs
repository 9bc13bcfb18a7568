pub mod code_generator;
pub mod csv;
pub mod jwt;
pub mod sanitize;
pub mod validation;

pub use code_generator::{generate_offline_id, generate_session_token};
pub use jwt::*;
pub use sanitize::*;
