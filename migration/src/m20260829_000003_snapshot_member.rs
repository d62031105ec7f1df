use sea_orm_migration::{prelude::*, schema::*};

static IDX_SNAPSHOT_MEMBER_MEMBER: &str = "idx_snapshot_member_member";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SnapshotMember::Table)
                    .if_not_exists()
                    .col(integer(SnapshotMember::SnapshotId))
                    .col(big_integer(SnapshotMember::MemberId))
                    .primary_key(
                        Index::create()
                            .col(SnapshotMember::SnapshotId)
                            .col(SnapshotMember::MemberId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_SNAPSHOT_MEMBER_MEMBER)
                    .table(SnapshotMember::Table)
                    .col(SnapshotMember::MemberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_SNAPSHOT_MEMBER_MEMBER)
                    .table(SnapshotMember::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SnapshotMember::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum SnapshotMember {
    Table,
    SnapshotId,
    MemberId,
}
