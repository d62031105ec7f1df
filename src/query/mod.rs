//! Read-side aggregation queries: heatmaps and leaderboards.
//!
//! Faction heatmaps come straight from the pre-aggregated buckets; member
//! heatmaps are derived from raw snapshots because per-member presence is not
//! pre-aggregated. Results are cached until newer snapshots land.

pub mod cache;
pub mod dayfilter;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::DbErr;
use serde::Serialize;

use crate::collector::slot;
use crate::data::SnapshotStore;

pub use self::cache::{QueryCache, QueryCacheConfig};
pub use self::dayfilter::DayFilter;

const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Bucket width for heatmap queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    QuarterHour,
}

impl Granularity {
    fn cache_key(self) -> &'static str {
        match self {
            Granularity::Hourly => "1h",
            Granularity::QuarterHour => "15m",
        }
    }
}

/// One faction heatmap cell: average active count for a recurring time bucket.
#[derive(Debug, Clone, Serialize)]
pub struct FactionHeatmapCell {
    pub day_of_week: i16,
    pub hour: i16,
    /// Present only at quarter-hour granularity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<i16>,
    pub average_active: f64,
    pub samples: i64,
}

/// One member heatmap cell: how often the member was active in a recurring
/// time bucket, as a percentage of observed weeks.
#[derive(Debug, Clone, Serialize)]
pub struct MemberHeatmapCell {
    pub day_of_week: i16,
    pub hour: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<i16>,
    pub active_percentage: f64,
    pub weeks_observed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub member_id: i64,
    pub name: Option<String>,
    pub appearances: i64,
    pub total_snapshots: u64,
    pub presence_percentage: f64,
}

/// Read-side query surface over the snapshot store.
pub struct AggregationQueries {
    store: SnapshotStore,
    faction_cache: Arc<QueryCache<Vec<FactionHeatmapCell>>>,
    member_cache: Arc<QueryCache<Vec<MemberHeatmapCell>>>,
}

impl AggregationQueries {
    pub fn new(store: SnapshotStore, cache_config: QueryCacheConfig) -> Self {
        Self {
            store,
            faction_cache: Arc::new(QueryCache::new(cache_config.clone())),
            member_cache: Arc::new(QueryCache::new(cache_config)),
        }
    }

    /// Average active counts per recurring bucket over the last `days` days,
    /// from the pre-aggregated sums.
    pub async fn faction_heatmap(
        &self,
        faction_id: i64,
        days: i64,
        filter: &DayFilter,
        granularity: Granularity,
        now: i64,
    ) -> Result<Vec<FactionHeatmapCell>, DbErr> {
        let data_timestamp = self.data_timestamp(faction_id).await?;
        let key = format!(
            "faction:{faction_id}:{days}:{}:{}",
            filter.cache_key(),
            granularity.cache_key()
        );
        if let Some(hit) = self.faction_cache.get(&key, data_timestamp) {
            return Ok(hit);
        }

        let since_date = slot::date_string(now - days * DAY_SECONDS);

        let mut cells: Vec<FactionHeatmapCell> = match granularity {
            Granularity::Hourly => self
                .store
                .get_hourly_aggregates(faction_id, &since_date)
                .await?
                .into_iter()
                .map(|b| FactionHeatmapCell {
                    day_of_week: b.day_of_week,
                    hour: b.hour,
                    slot: None,
                    average_active: bucket_average(b.active_sum, b.snapshot_count),
                    samples: b.snapshot_count.unwrap_or(0),
                })
                .collect(),
            Granularity::QuarterHour => self
                .store
                .get_quarter_hour_aggregates(faction_id, &since_date)
                .await?
                .into_iter()
                .map(|b| FactionHeatmapCell {
                    day_of_week: b.day_of_week,
                    hour: b.hour,
                    slot: Some(b.slot),
                    average_active: bucket_average(b.active_sum, b.snapshot_count),
                    samples: b.snapshot_count.unwrap_or(0),
                })
                .collect(),
        };

        cells.retain(|c| filter.matches(c.day_of_week as u32));
        cells.sort_by_key(|c| (c.day_of_week, c.hour, c.slot));

        self.faction_cache.put(key, cells.clone(), data_timestamp);

        Ok(cells)
    }

    /// Per-week presence percentages for one member within one faction.
    ///
    /// Each (week, bucket) pair counts once no matter how many snapshots fall
    /// in it; the member is active for the pair when active in any of them.
    /// The percentage is active weeks over weeks with data, per bucket.
    pub async fn member_heatmap(
        &self,
        member_id: i64,
        faction_id: i64,
        days: i64,
        filter: &DayFilter,
        granularity: Granularity,
        now: i64,
    ) -> Result<Vec<MemberHeatmapCell>, DbErr> {
        let data_timestamp = self.data_timestamp(faction_id).await?;
        let key = format!(
            "member:{member_id}:{faction_id}:{days}:{}:{}",
            filter.cache_key(),
            granularity.cache_key()
        );
        if let Some(hit) = self.member_cache.get(&key, data_timestamp) {
            return Ok(hit);
        }

        let snapshots = self
            .store
            .get_snapshots_since(faction_id, now - days * DAY_SECONDS)
            .await?;

        // Bucket key -> weeks with any snapshot, weeks with the member active.
        let mut observed: HashMap<(i16, i16, Option<i16>), HashSet<i64>> = HashMap::new();
        let mut active: HashMap<(i16, i16, Option<i16>), HashSet<i64>> = HashMap::new();

        for snapshot in &snapshots {
            let day = slot::day_of_week(snapshot.timestamp) as i16;
            if !filter.matches(day as u32) {
                continue;
            }

            let hour = slot::hour_of_day(snapshot.timestamp) as i16;
            let sub = match granularity {
                Granularity::Hourly => None,
                Granularity::QuarterHour => Some(slot::sub_slot(snapshot.timestamp) as i16),
            };
            let week = slot::week_id(snapshot.timestamp, now);

            let bucket = (day, hour, sub);
            observed.entry(bucket).or_default().insert(week);
            if snapshot.active.contains(&member_id) {
                active.entry(bucket).or_default().insert(week);
            }
        }

        let mut cells: Vec<MemberHeatmapCell> = observed
            .into_iter()
            .map(|((day, hour, sub), weeks)| {
                let active_weeks = active
                    .get(&(day, hour, sub))
                    .map(|set| set.len())
                    .unwrap_or(0);
                MemberHeatmapCell {
                    day_of_week: day,
                    hour,
                    slot: sub,
                    active_percentage: active_weeks as f64 / weeks.len() as f64 * 100.0,
                    weeks_observed: weeks.len(),
                }
            })
            .collect();

        cells.sort_by_key(|c| (c.day_of_week, c.hour, c.slot));

        self.member_cache.put(key, cells.clone(), data_timestamp);

        Ok(cells)
    }

    /// Like [`Self::member_heatmap`], but merged across every faction the
    /// member has been sighted in. Snapshots sharing a slot timestamp count
    /// once; the member is active for the slot when active in any of them.
    pub async fn member_heatmap_combined(
        &self,
        member_id: i64,
        days: i64,
        filter: &DayFilter,
        granularity: Granularity,
        now: i64,
    ) -> Result<Vec<MemberHeatmapCell>, DbErr> {
        let history = self.store.get_member_faction_history(member_id).await?;

        // Slot timestamp -> was the member active anywhere in that slot.
        let mut slots: HashMap<i64, bool> = HashMap::new();
        let mut data_timestamp = 0;
        for association in &history {
            let snapshots = self
                .store
                .get_snapshots_since(association.faction_id, now - days * DAY_SECONDS)
                .await?;
            for snapshot in snapshots {
                data_timestamp = data_timestamp.max(snapshot.timestamp);
                let active = snapshot.active.contains(&member_id);
                slots
                    .entry(snapshot.timestamp)
                    .and_modify(|a| *a |= active)
                    .or_insert(active);
            }
        }

        let key = format!(
            "member-all:{member_id}:{days}:{}:{}",
            filter.cache_key(),
            granularity.cache_key()
        );
        if let Some(hit) = self.member_cache.get(&key, data_timestamp) {
            return Ok(hit);
        }

        let mut observed: HashMap<(i16, i16, Option<i16>), HashSet<i64>> = HashMap::new();
        let mut active_weeks: HashMap<(i16, i16, Option<i16>), HashSet<i64>> = HashMap::new();
        for (timestamp, active) in slots {
            let day = slot::day_of_week(timestamp) as i16;
            if !filter.matches(day as u32) {
                continue;
            }

            let hour = slot::hour_of_day(timestamp) as i16;
            let sub = match granularity {
                Granularity::Hourly => None,
                Granularity::QuarterHour => Some(slot::sub_slot(timestamp) as i16),
            };
            let week = slot::week_id(timestamp, now);

            let bucket = (day, hour, sub);
            observed.entry(bucket).or_default().insert(week);
            if active {
                active_weeks.entry(bucket).or_default().insert(week);
            }
        }

        let mut cells: Vec<MemberHeatmapCell> = observed
            .into_iter()
            .map(|((day, hour, sub), weeks)| {
                let hits = active_weeks
                    .get(&(day, hour, sub))
                    .map(|set| set.len())
                    .unwrap_or(0);
                MemberHeatmapCell {
                    day_of_week: day,
                    hour,
                    slot: sub,
                    active_percentage: hits as f64 / weeks.len() as f64 * 100.0,
                    weeks_observed: weeks.len(),
                }
            })
            .collect();

        cells.sort_by_key(|c| (c.day_of_week, c.hour, c.slot));

        self.member_cache.put(key, cells.clone(), data_timestamp);

        Ok(cells)
    }

    /// Members ranked by presence across the faction's snapshots in the
    /// window, with names resolved from the identity table.
    pub async fn member_leaderboard(
        &self,
        faction_id: i64,
        days: i64,
        limit: u64,
        now: i64,
    ) -> Result<Vec<LeaderboardEntry>, DbErr> {
        let since = now - days * DAY_SECONDS;
        let rows = self
            .store
            .get_member_leaderboard(faction_id, since, limit)
            .await?;
        let total = self.store.get_snapshot_count_since(faction_id, since).await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.member_id).collect();
        let names: HashMap<i64, String> = self
            .store
            .get_members_by_ids(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                member_id: row.member_id,
                name: names.get(&row.member_id).cloned(),
                appearances: row.appearances,
                total_snapshots: total,
                presence_percentage: if total > 0 {
                    row.appearances as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect())
    }

    pub fn clear_caches(&self) {
        self.faction_cache.clear();
        self.member_cache.clear();
    }

    /// Latest snapshot timestamp for the faction; cache entries computed from
    /// older data stop matching once this moves.
    async fn data_timestamp(&self, faction_id: i64) -> Result<i64, DbErr> {
        Ok(self
            .store
            .get_latest_snapshot(faction_id)
            .await?
            .map(|s| s.slot_timestamp)
            .unwrap_or(0))
    }
}

fn bucket_average(active_sum: Option<i64>, snapshot_count: Option<i64>) -> f64 {
    let count = snapshot_count.unwrap_or(0);
    if count == 0 {
        return 0.0;
    }
    active_sum.unwrap_or(0) as f64 / count as f64
}
