use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
pub enum TransactionKind {
    /// setoran
    #[sea_orm(string_value = "Setor")]
    Setor,
    /// penarikan
    #[sea_orm(string_value = "Tarik")]
    Tarik,
}

impl TransactionKind {
    /// Efek bertanda terhadap saldo.
    pub fn signed(self, jumlah: i64) -> i64 {
        match self {
            TransactionKind::Setor => jumlah,
            TransactionKind::Tarik => -jumlah,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "setor" | "setoran" | "deposit" => Some(TransactionKind::Setor),
            "tarik" | "penarikan" | "withdraw" | "withdrawal" => Some(TransactionKind::Tarik),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Setor => write!(f, "Setor"),
            TransactionKind::Tarik => write!(f, "Tarik"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub jenis: TransactionKind,
    pub jumlah: i64,
    /// tanggal efektif, bukan tanggal input
    pub tanggal: NaiveDate,
    pub saldo_setelah: i64,
    pub keterangan: Option<String>,
    pub admin: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
