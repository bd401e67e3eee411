use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::ActorId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Message).text().not_null())
                    .col(
                        ColumnDef::new(AuditLogs::Severity)
                            .string_len(16)
                            .not_null()
                            .default("info"),
                    )
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_created_at")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IpBlacklist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IpBlacklist::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IpBlacklist::IpAddress)
                            .string_len(45)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(IpBlacklist::Reason).text().null())
                    .col(ColumnDef::new(IpBlacklist::BlockedBy).big_integer().null())
                    .col(
                        ColumnDef::new(IpBlacklist::CreatedAt)
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
            .drop_table(Table::drop().table(IpBlacklist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    ActorId,
    Message,
    Severity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum IpBlacklist {
    Table,
    Id,
    IpAddress,
    Reason,
    BlockedBy,
    CreatedAt,
}
