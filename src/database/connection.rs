use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let pool = connect(&config.url, config.max_connections).await?;
    Ok(pool)
}

pub async fn connect(url: &str, max_connections: u32) -> AppResult<DbPool> {
    let mut opt = ConnectOptions::new(url.to_string());
    opt.max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    // SQLite in-memory hanya hidup selama koneksinya hidup
    if url.starts_with("sqlite::memory:") {
        opt.max_connections(1).min_connections(1);
    }
    Ok(Database::connect(opt).await?)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}
