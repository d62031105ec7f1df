use sea_orm_migration::{prelude::*, schema::*};

static IDX_DAILY_AGGREGATE_LOOKUP: &str = "idx_daily_aggregate_lookup";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyAggregate::Table)
                    .if_not_exists()
                    .col(big_integer(DailyAggregate::FactionId))
                    .col(string(DailyAggregate::Date))
                    .col(small_integer(DailyAggregate::Hour))
                    .col(small_integer(DailyAggregate::Slot))
                    .col(small_integer(DailyAggregate::DayOfWeek))
                    .col(big_integer(DailyAggregate::ActiveSum))
                    .col(big_integer(DailyAggregate::SnapshotCount))
                    .primary_key(
                        Index::create()
                            .col(DailyAggregate::FactionId)
                            .col(DailyAggregate::Date)
                            .col(DailyAggregate::Hour)
                            .col(DailyAggregate::Slot),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_DAILY_AGGREGATE_LOOKUP)
                    .table(DailyAggregate::Table)
                    .col(DailyAggregate::FactionId)
                    .col(DailyAggregate::DayOfWeek)
                    .col(DailyAggregate::Hour)
                    .col(DailyAggregate::Slot)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_DAILY_AGGREGATE_LOOKUP)
                    .table(DailyAggregate::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DailyAggregate::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum DailyAggregate {
    Table,
    FactionId,
    Date,
    Hour,
    Slot,
    DayOfWeek,
    ActiveSum,
    SnapshotCount,
}
