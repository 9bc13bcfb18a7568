pub mod connection;

pub use connection::*;

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::entities::{class_entity, student_entity};
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    /// Database utama di memori, sudah dimigrasi.
    pub async fn memory_db() -> DbPool {
        let db = connect("sqlite::memory:", 1).await.unwrap();
        run_migrations(&db).await.unwrap();
        db
    }

    pub async fn seed_class(db: &DbPool, nama_kelas: &str) -> class_entity::Model {
        let now = Utc::now();
        class_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            nama_kelas: Set(nama_kelas.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn seed_student(
        db: &DbPool,
        kelas_id: Uuid,
        nis: &str,
        nama: &str,
        saldo: i64,
    ) -> student_entity::Model {
        let now = Utc::now();
        student_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            nis: Set(nis.to_string()),
            nama: Set(nama.to_string()),
            kelas_id: Set(kelas_id),
            saldo: Set(saldo),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }
}
