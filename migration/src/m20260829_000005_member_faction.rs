use sea_orm_migration::{prelude::*, schema::*};

static IDX_MEMBER_FACTION_MEMBER: &str = "idx_member_faction_member";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemberFaction::Table)
                    .if_not_exists()
                    .col(big_integer(MemberFaction::MemberId))
                    .col(big_integer(MemberFaction::FactionId))
                    .col(big_integer(MemberFaction::FirstSeen))
                    .col(big_integer(MemberFaction::LastSeen))
                    .primary_key(
                        Index::create()
                            .col(MemberFaction::MemberId)
                            .col(MemberFaction::FactionId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_MEMBER_FACTION_MEMBER)
                    .table(MemberFaction::Table)
                    .col(MemberFaction::MemberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_MEMBER_FACTION_MEMBER)
                    .table(MemberFaction::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MemberFaction::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum MemberFaction {
    Table,
    MemberId,
    FactionId,
    FirstSeen,
    LastSeen,
}
