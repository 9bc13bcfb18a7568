use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Role,
    Nama,
    Email,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WaliKelas {
    Table,
    Id,
    UserId,
    KelasId,
    Nama,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Classes {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // id profile == id user di auth provider
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::Role).string_len(20).not_null())
                    .col(ColumnDef::new(Profiles::Nama).string_len(100).null())
                    .col(ColumnDef::new(Profiles::Email).string_len(150).null())
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WaliKelas::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WaliKelas::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(WaliKelas::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WaliKelas::KelasId).uuid().not_null())
                    .col(ColumnDef::new(WaliKelas::Nama).string_len(100).not_null())
                    .col(
                        ColumnDef::new(WaliKelas::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wali_kelas_kelas")
                            .from(WaliKelas::Table, WaliKelas::KelasId)
                            .to(Classes::Table, Classes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WaliKelas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        Ok(())
    }
}
