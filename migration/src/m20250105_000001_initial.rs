use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Classes {
    Table,
    Id,
    NamaKelas,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    Nis,
    Nama,
    KelasId,
    Saldo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    StudentId,
    Jenis,
    Jumlah,
    Tanggal,
    SaldoSetelah,
    Keterangan,
    Admin,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SchoolData {
    Table,
    Id,
    NamaSekolah,
    Alamat,
    Telepon,
    Email,
    KepalaSekolah,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Classes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Classes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Classes::NamaKelas).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Classes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Classes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Students::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Students::Nis)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Students::Nama).string_len(100).not_null())
                    .col(ColumnDef::new(Students::KelasId).uuid().not_null())
                    .col(
                        ColumnDef::new(Students::Saldo)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Students::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Students::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_students_kelas")
                            .from(Students::Table, Students::KelasId)
                            .to(Classes::Table, Classes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::Jenis).string_len(10).not_null())
                    .col(ColumnDef::new(Transactions::Jumlah).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Tanggal).date().not_null())
                    .col(
                        ColumnDef::new(Transactions::SaldoSetelah)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Keterangan).string_len(255).null())
                    .col(ColumnDef::new(Transactions::Admin).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_student")
                            .from(Transactions::Table, Transactions::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // replay saldo per siswa selalu berurutan (tanggal, created_at)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_student_tanggal")
                    .table(Transactions::Table)
                    .col(Transactions::StudentId)
                    .col(Transactions::Tanggal)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SchoolData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SchoolData::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SchoolData::NamaSekolah).string_len(150).not_null())
                    .col(ColumnDef::new(SchoolData::Alamat).string_len(255).null())
                    .col(ColumnDef::new(SchoolData::Telepon).string_len(30).null())
                    .col(ColumnDef::new(SchoolData::Email).string_len(100).null())
                    .col(ColumnDef::new(SchoolData::KepalaSekolah).string_len(100).null())
                    .col(
                        ColumnDef::new(SchoolData::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SchoolData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classes::Table).to_owned())
            .await?;
        Ok(())
    }
}
