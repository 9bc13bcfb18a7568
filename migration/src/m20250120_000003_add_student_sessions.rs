use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum StudentSessions {
    Table,
    Token,
    StudentId,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StudentSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentSessions::Token)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StudentSessions::StudentId).uuid().not_null())
                    .col(
                        ColumnDef::new(StudentSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_sessions_student")
                            .from(StudentSessions::Table, StudentSessions::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_student_sessions_expires_at")
                    .table(StudentSessions::Table)
                    .col(StudentSessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StudentSessions::Table).to_owned())
            .await?;
        Ok(())
    }
}
