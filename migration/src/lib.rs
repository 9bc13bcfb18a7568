pub use sea_orm_migration::prelude::*;

mod m20250105_000001_initial;
mod m20250112_000002_add_roles;
mod m20250120_000003_add_student_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250105_000001_initial::Migration),
            Box::new(m20250112_000002_add_roles::Migration),
            Box::new(m20250120_000003_add_student_sessions::Migration),
        ]
    }
}
