//! Persistence layer.
//!
//! Repositories are thin, connection-generic query bundles; [`SnapshotStore`]
//! owns the connection and sequences multi-table writes inside transactions.

pub mod aggregate;
pub mod faction;
pub mod member;
pub mod snapshot;

use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use serde::Serialize;

pub use self::aggregate::{AggregateRepository, HourlyBucket, QuarterHourBucket};
pub use self::faction::FactionRepository;
pub use self::member::MemberRepository;
pub use self::snapshot::{ActivityLevel, LeaderboardRow, NormalizedSnapshot, SnapshotRepository};

/// Snapshots removed per delete statement while pruning.
const PRUNE_BATCH_SIZE: u64 = 500;

/// A faction counts as inactive when, over the last day of snapshots, its
/// average active count stays under this...
const INACTIVE_AVG_THRESHOLD: f64 = 2.0;
/// ...and its peak active count stays under this.
const INACTIVE_MAX_THRESHOLD: i32 = 5;

const INACTIVE_WINDOW_SECONDS: i64 = 24 * 60 * 60;

/// Row counts across the main tables, for the status surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DbStats {
    pub factions: u64,
    pub snapshots: u64,
    pub members: u64,
    pub aggregates: u64,
}

/// Owns the database connection and coordinates all snapshot-engine writes.
#[derive(Clone)]
pub struct SnapshotStore {
    db: DatabaseConnection,
}

impl SnapshotStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Persists one poll result atomically: faction upsert, snapshot row,
    /// membership set, member identities and associations, and the
    /// incremental aggregate bump. Either everything lands or nothing does.
    ///
    /// `total_count` is the roster size at poll time; it can exceed
    /// `member_names` when some roster ids were unusable.
    pub async fn add_snapshot(
        &self,
        faction_id: i64,
        faction_name: &str,
        slot_timestamp: i64,
        active_member_ids: &[i64],
        total_count: i32,
        member_names: &[(i64, String)],
    ) -> Result<i32, DbErr> {
        let txn = self.db.begin().await?;

        FactionRepository::new(&txn)
            .upsert_name(faction_id, faction_name, slot_timestamp)
            .await?;

        let snapshots = SnapshotRepository::new(&txn);
        let snapshot_id = snapshots
            .insert(
                faction_id,
                slot_timestamp,
                active_member_ids.len() as i32,
                total_count,
            )
            .await?;
        snapshots.insert_members(snapshot_id, active_member_ids).await?;

        let members = MemberRepository::new(&txn);
        members.upsert_many(member_names, slot_timestamp).await?;
        members
            .record_associations(active_member_ids, faction_id, slot_timestamp)
            .await?;

        AggregateRepository::new(&txn)
            .increment(faction_id, slot_timestamp, active_member_ids.len() as i32)
            .await?;

        txn.commit().await?;

        Ok(snapshot_id)
    }

    pub async fn has_snapshot_for_slot(
        &self,
        faction_id: i64,
        slot_timestamp: i64,
        tolerance: i64,
    ) -> Result<bool, DbErr> {
        SnapshotRepository::new(&self.db)
            .exists_for_slot(faction_id, slot_timestamp, tolerance)
            .await
    }

    pub async fn get_snapshots_since(
        &self,
        faction_id: i64,
        since: i64,
    ) -> Result<Vec<NormalizedSnapshot>, DbErr> {
        SnapshotRepository::new(&self.db)
            .normalized_since(faction_id, since)
            .await
    }

    pub async fn get_latest_snapshot(
        &self,
        faction_id: i64,
    ) -> Result<Option<entity::snapshot::Model>, DbErr> {
        SnapshotRepository::new(&self.db).latest(faction_id).await
    }

    pub async fn get_snapshot_count(&self, faction_id: i64) -> Result<u64, DbErr> {
        SnapshotRepository::new(&self.db).count_for_faction(faction_id).await
    }

    pub async fn get_snapshot_count_since(
        &self,
        faction_id: i64,
        since: i64,
    ) -> Result<u64, DbErr> {
        SnapshotRepository::new(&self.db)
            .count_for_faction_since(faction_id, since)
            .await
    }

    pub async fn get_week_count(&self, faction_id: i64, since: i64) -> Result<u64, DbErr> {
        SnapshotRepository::new(&self.db).week_count(faction_id, since).await
    }

    pub async fn get_member_leaderboard(
        &self,
        faction_id: i64,
        since: i64,
        limit: u64,
    ) -> Result<Vec<LeaderboardRow>, DbErr> {
        SnapshotRepository::new(&self.db)
            .member_leaderboard(faction_id, since, limit)
            .await
    }

    pub async fn get_hourly_aggregates(
        &self,
        faction_id: i64,
        since_date: &str,
    ) -> Result<Vec<HourlyBucket>, DbErr> {
        AggregateRepository::new(&self.db)
            .hourly_since(faction_id, since_date)
            .await
    }

    pub async fn get_quarter_hour_aggregates(
        &self,
        faction_id: i64,
        since_date: &str,
    ) -> Result<Vec<QuarterHourBucket>, DbErr> {
        AggregateRepository::new(&self.db)
            .quarter_hour_since(faction_id, since_date)
            .await
    }

    pub async fn get_recent_activity_level(
        &self,
        faction_id: i64,
        since: i64,
    ) -> Result<ActivityLevel, DbErr> {
        SnapshotRepository::new(&self.db)
            .activity_level(faction_id, since)
            .await
    }

    /// Whether the faction has shown next to no activity over the last day.
    /// Factions with no snapshots yet are never judged inactive.
    pub async fn is_inactive_faction(&self, faction_id: i64, now: i64) -> Result<bool, DbErr> {
        let level = SnapshotRepository::new(&self.db)
            .activity_level(faction_id, now - INACTIVE_WINDOW_SECONDS)
            .await?;

        if level.snapshots == 0 {
            return Ok(false);
        }

        let avg = level.active_sum.unwrap_or(0) as f64 / level.snapshots as f64;
        let max = level.active_max.unwrap_or(0);

        Ok(avg < INACTIVE_AVG_THRESHOLD && max < INACTIVE_MAX_THRESHOLD)
    }

    pub async fn get_faction_last_updated(&self, faction_id: i64) -> Result<Option<i64>, DbErr> {
        FactionRepository::new(&self.db).last_updated(faction_id).await
    }

    pub async fn tracked_faction_ids(&self) -> Result<Vec<i64>, DbErr> {
        FactionRepository::new(&self.db).tracked_ids().await
    }

    pub async fn track_factions(&self, factions: Vec<(i64, String)>) -> Result<usize, DbErr> {
        FactionRepository::new(&self.db).track_many(factions).await
    }

    pub async fn untrack_factions(&self, faction_ids: &[i64]) -> Result<u64, DbErr> {
        FactionRepository::new(&self.db).untrack_many(faction_ids).await
    }

    pub async fn get_faction(
        &self,
        faction_id: i64,
    ) -> Result<Option<entity::faction::Model>, DbErr> {
        FactionRepository::new(&self.db).find_by_faction_id(faction_id).await
    }

    pub async fn search_members(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<entity::member::Model>, DbErr> {
        MemberRepository::new(&self.db).search(query, limit).await
    }

    pub async fn get_member(&self, member_id: i64) -> Result<Option<entity::member::Model>, DbErr> {
        MemberRepository::new(&self.db).find_by_id(member_id).await
    }

    pub async fn get_members_by_ids(
        &self,
        member_ids: &[i64],
    ) -> Result<Vec<entity::member::Model>, DbErr> {
        MemberRepository::new(&self.db).find_by_ids(member_ids).await
    }

    pub async fn get_member_faction_history(
        &self,
        member_id: i64,
    ) -> Result<Vec<entity::member_faction::Model>, DbErr> {
        MemberRepository::new(&self.db).faction_history(member_id).await
    }

    /// Removes snapshots older than the retention window, in batches, along
    /// with aggregate buckets for dates entirely outside the window. Returns
    /// how many snapshots went.
    pub async fn prune_old_data(&self, retention_days: i64, now: i64) -> Result<u64, DbErr> {
        let cutoff = now - retention_days * 24 * 60 * 60;

        let snapshots = SnapshotRepository::new(&self.db);
        let mut total: u64 = 0;
        loop {
            let deleted = snapshots.delete_batch_before(cutoff, PRUNE_BATCH_SIZE).await?;
            total += deleted;
            if deleted < PRUNE_BATCH_SIZE {
                break;
            }
        }

        let cutoff_date = crate::collector::slot::date_string(cutoff);
        AggregateRepository::new(&self.db).delete_before(&cutoff_date).await?;

        if total > 0 {
            tracing::info!(snapshots = total, "Pruned expired snapshots");
        }

        Ok(total)
    }

    pub async fn get_db_stats(&self) -> Result<DbStats, DbErr> {
        Ok(DbStats {
            factions: FactionRepository::new(&self.db).count().await?,
            snapshots: SnapshotRepository::new(&self.db).count().await?,
            members: MemberRepository::new(&self.db).count().await?,
            aggregates: AggregateRepository::new(&self.db).count().await?,
        })
    }
}
