use std::collections::HashMap;

use migration::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    sea_query::{Expr, ExprTrait},
};

/// Rows inserted per statement when writing membership sets.
const INSERT_CHUNK_SIZE: usize = 500;

/// One snapshot with its active member set attached.
#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub timestamp: i64,
    pub active: Vec<i64>,
    pub total: i32,
}

/// Coarse activity summary over a recent window, for inactivity judging.
#[derive(Debug, Clone, Copy, Default, FromQueryResult)]
pub struct ActivityLevel {
    pub snapshots: i64,
    pub active_sum: Option<i64>,
    pub active_max: Option<i32>,
}

/// One member's presence count across a faction's recent snapshots.
#[derive(Debug, Clone, FromQueryResult)]
pub struct LeaderboardRow {
    pub member_id: i64,
    pub appearances: i64,
}

pub struct SnapshotRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SnapshotRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Inserts the snapshot row and returns its id.
    pub async fn insert(
        &self,
        faction_id: i64,
        slot_timestamp: i64,
        active_count: i32,
        total_count: i32,
    ) -> Result<i32, DbErr> {
        let model = entity::snapshot::ActiveModel {
            faction_id: ActiveValue::Set(faction_id),
            slot_timestamp: ActiveValue::Set(slot_timestamp),
            active_count: ActiveValue::Set(active_count),
            total_count: ActiveValue::Set(total_count),
            ..Default::default()
        };

        let result = entity::prelude::Snapshot::insert(model).exec(self.db).await?;

        Ok(result.last_insert_id)
    }

    /// Writes the active member set for a snapshot, in chunks. Duplicate
    /// (snapshot, member) pairs are ignored so a partially-written set can be
    /// re-run.
    pub async fn insert_members(&self, snapshot_id: i32, member_ids: &[i64]) -> Result<(), DbErr> {
        for chunk in member_ids.chunks(INSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|member_id| entity::snapshot_member::ActiveModel {
                snapshot_id: ActiveValue::Set(snapshot_id),
                member_id: ActiveValue::Set(*member_id),
            });

            entity::prelude::SnapshotMember::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        entity::snapshot_member::Column::SnapshotId,
                        entity::snapshot_member::Column::MemberId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db)
                .await?;
        }

        Ok(())
    }

    /// Whether a snapshot already exists within `tolerance` seconds of the
    /// given slot boundary.
    pub async fn exists_for_slot(
        &self,
        faction_id: i64,
        slot_timestamp: i64,
        tolerance: i64,
    ) -> Result<bool, DbErr> {
        let count = entity::prelude::Snapshot::find()
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(slot_timestamp - tolerance))
            .filter(entity::snapshot::Column::SlotTimestamp.lte(slot_timestamp + tolerance))
            .count(self.db)
            .await?;

        Ok(count > 0)
    }

    /// All snapshots since `since`, oldest first, with member sets attached.
    ///
    /// Membership rows are fetched in one pass and grouped in memory rather
    /// than per-snapshot.
    pub async fn normalized_since(
        &self,
        faction_id: i64,
        since: i64,
    ) -> Result<Vec<NormalizedSnapshot>, DbErr> {
        let snapshots = entity::prelude::Snapshot::find()
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(since))
            .order_by_asc(entity::snapshot::Column::SlotTimestamp)
            .all(self.db)
            .await?;

        if snapshots.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = snapshots.iter().map(|s| s.id).collect();
        let members = entity::prelude::SnapshotMember::find()
            .filter(entity::snapshot_member::Column::SnapshotId.is_in(ids))
            .all(self.db)
            .await?;

        let mut by_snapshot: HashMap<i32, Vec<i64>> = HashMap::new();
        for row in members {
            by_snapshot.entry(row.snapshot_id).or_default().push(row.member_id);
        }

        Ok(snapshots
            .into_iter()
            .map(|s| NormalizedSnapshot {
                timestamp: s.slot_timestamp,
                active: by_snapshot.remove(&s.id).unwrap_or_default(),
                total: s.total_count,
            })
            .collect())
    }

    pub async fn latest(&self, faction_id: i64) -> Result<Option<entity::snapshot::Model>, DbErr> {
        entity::prelude::Snapshot::find()
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .order_by_desc(entity::snapshot::Column::SlotTimestamp)
            .one(self.db)
            .await
    }

    pub async fn count_for_faction(&self, faction_id: i64) -> Result<u64, DbErr> {
        entity::prelude::Snapshot::find()
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .count(self.db)
            .await
    }

    pub async fn count_for_faction_since(&self, faction_id: i64, since: i64) -> Result<u64, DbErr> {
        entity::prelude::Snapshot::find()
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(since))
            .count(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        entity::prelude::Snapshot::find().count(self.db).await
    }

    /// Snapshot count and active-count sum/max since `since`, from the
    /// snapshot rows alone.
    pub async fn activity_level(
        &self,
        faction_id: i64,
        since: i64,
    ) -> Result<ActivityLevel, DbErr> {
        let level = entity::prelude::Snapshot::find()
            .select_only()
            .column_as(
                Expr::col(entity::snapshot::Column::Id).count(),
                "snapshots",
            )
            .column_as(
                Expr::col(entity::snapshot::Column::ActiveCount).sum(),
                "active_sum",
            )
            .column_as(
                Expr::col(entity::snapshot::Column::ActiveCount).max(),
                "active_max",
            )
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(since))
            .into_model::<ActivityLevel>()
            .one(self.db)
            .await?;

        Ok(level.unwrap_or_default())
    }

    /// Members ranked by how many of the faction's snapshots since `since`
    /// they appear in.
    pub async fn member_leaderboard(
        &self,
        faction_id: i64,
        since: i64,
        limit: u64,
    ) -> Result<Vec<LeaderboardRow>, DbErr> {
        entity::prelude::SnapshotMember::find()
            .select_only()
            .column(entity::snapshot_member::Column::MemberId)
            .column_as(
                Expr::col(entity::snapshot_member::Column::SnapshotId).count(),
                "appearances",
            )
            .join(
                JoinType::InnerJoin,
                entity::snapshot_member::Relation::Snapshot.def(),
            )
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(since))
            .group_by(entity::snapshot_member::Column::MemberId)
            .order_by_desc(Expr::col(entity::snapshot_member::Column::SnapshotId).count())
            .limit(limit)
            .into_model::<LeaderboardRow>()
            .all(self.db)
            .await
    }

    /// Deletes up to `batch` snapshots older than `cutoff` along with their
    /// membership rows. Returns how many snapshots went.
    pub async fn delete_batch_before(&self, cutoff: i64, batch: u64) -> Result<u64, DbErr> {
        let ids: Vec<i32> = entity::prelude::Snapshot::find()
            .select_only()
            .column(entity::snapshot::Column::Id)
            .filter(entity::snapshot::Column::SlotTimestamp.lt(cutoff))
            .order_by_asc(entity::snapshot::Column::SlotTimestamp)
            .limit(batch)
            .into_tuple::<i32>()
            .all(self.db)
            .await?;

        if ids.is_empty() {
            return Ok(0);
        }

        entity::prelude::SnapshotMember::delete_many()
            .filter(entity::snapshot_member::Column::SnapshotId.is_in(ids.clone()))
            .exec(self.db)
            .await?;

        let deleted = entity::prelude::Snapshot::delete_many()
            .filter(entity::snapshot::Column::Id.is_in(ids))
            .exec(self.db)
            .await?;

        Ok(deleted.rows_affected)
    }

    /// Count of distinct calendar weeks covered by the faction's snapshots
    /// since `since`, weeks starting Sunday midnight UTC.
    pub async fn week_count(&self, faction_id: i64, since: i64) -> Result<u64, DbErr> {
        use crate::collector::slot;

        let timestamps: Vec<i64> = entity::prelude::Snapshot::find()
            .select_only()
            .column(entity::snapshot::Column::SlotTimestamp)
            .filter(entity::snapshot::Column::FactionId.eq(faction_id))
            .filter(entity::snapshot::Column::SlotTimestamp.gte(since))
            .into_tuple::<i64>()
            .all(self.db)
            .await?;

        let weeks: std::collections::HashSet<i64> = timestamps
            .into_iter()
            .map(slot::week_start)
            .collect();

        Ok(weeks.len() as u64)
    }
}
