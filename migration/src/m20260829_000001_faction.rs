use sea_orm_migration::{prelude::*, schema::*};

static IDX_FACTION_TRACKED: &str = "idx_faction_tracked";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Faction::Table)
                    .if_not_exists()
                    .col(pk_auto(Faction::Id))
                    .col(big_integer_uniq(Faction::FactionId))
                    .col(string(Faction::Name))
                    .col(boolean(Faction::Tracked))
                    .col(big_integer(Faction::LastUpdated))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_FACTION_TRACKED)
                    .table(Faction::Table)
                    .col(Faction::Tracked)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_FACTION_TRACKED)
                    .table(Faction::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Faction::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Faction {
    Table,
    Id,
    FactionId,
    Name,
    Tracked,
    LastUpdated,
}
