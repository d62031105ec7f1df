use sea_orm_migration::{prelude::*, schema::*};

static IDX_RANKING_FACTION_POSITION: &str = "idx_ranking_faction_position";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RankingFaction::Table)
                    .if_not_exists()
                    .col(big_integer(RankingFaction::FactionId).primary_key())
                    .col(string(RankingFaction::Name))
                    .col(integer(RankingFaction::Members))
                    .col(integer(RankingFaction::Position))
                    .col(string(RankingFaction::Rank))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_RANKING_FACTION_POSITION)
                    .table(RankingFaction::Table)
                    .col(RankingFaction::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RankingMeta::Table)
                    .if_not_exists()
                    .col(integer(RankingMeta::Id).primary_key())
                    .col(big_integer(RankingMeta::RefreshedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RankingMeta::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_RANKING_FACTION_POSITION)
                    .table(RankingFaction::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(RankingFaction::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum RankingFaction {
    Table,
    FactionId,
    Name,
    Members,
    Position,
    Rank,
}

#[derive(DeriveIden)]
pub enum RankingMeta {
    Table,
    Id,
    RefreshedAt,
}
