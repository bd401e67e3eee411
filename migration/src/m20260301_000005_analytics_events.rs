//! Analytics event log
//!
//! No foreign keys: events outlive the pages and links they reference so
//! historical totals survive content deletion.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AnalyticsEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalyticsEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::UserId).big_integer().not_null())
                    .col(ColumnDef::new(AnalyticsEvents::PageId).big_integer().not_null())
                    .col(ColumnDef::new(AnalyticsEvents::LinkId).big_integer().null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::VisitorId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(AnalyticsEvents::UserAgent).text().null())
                    .col(ColumnDef::new(AnalyticsEvents::Referrer).text().null())
                    .col(ColumnDef::new(AnalyticsEvents::Country).string_len(100).null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::CountryCode)
                            .string_len(8)
                            .null(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::City).string_len(100).null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Every aggregate filters by owner, most by time window as well
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_user_created")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::UserId)
                    .col(AnalyticsEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_page_id")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::PageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_link_id")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::LinkId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalyticsEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AnalyticsEvents {
    Table,
    Id,
    UserId,
    PageId,
    LinkId,
    VisitorId,
    IpAddress,
    UserAgent,
    Referrer,
    Country,
    CountryCode,
    City,
    CreatedAt,
}
