use sea_orm_migration::{prelude::*, schema::*};

static IDX_SNAPSHOT_FACTION_TIME: &str = "idx_snapshot_faction_time";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Snapshot::Table)
                    .if_not_exists()
                    .col(pk_auto(Snapshot::Id))
                    .col(big_integer(Snapshot::FactionId))
                    .col(big_integer(Snapshot::SlotTimestamp))
                    .col(integer(Snapshot::ActiveCount))
                    .col(integer(Snapshot::TotalCount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_SNAPSHOT_FACTION_TIME)
                    .table(Snapshot::Table)
                    .col(Snapshot::FactionId)
                    .col((Snapshot::SlotTimestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_SNAPSHOT_FACTION_TIME)
                    .table(Snapshot::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Snapshot::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Snapshot {
    Table,
    Id,
    FactionId,
    SlotTimestamp,
    ActiveCount,
    TotalCount,
}
