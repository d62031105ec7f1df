//! Locally cached faction ranking directory.
//!
//! The provider's ranking listing is slow to sweep and changes rarely, so it
//! is mirrored into the database and refreshed at most once per staleness
//! interval. Reads always hit the local mirror.

use std::time::Duration;

use sea_orm::{
    ActiveValue, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::LikeExpr,
};
use serde::Serialize;

use crate::api::ApiClient;
use crate::api::model::RankingEntry;
use crate::data::member::escape_like;
use crate::error::Error;

const META_ROW_ID: i32 = 1;
const INSERT_CHUNK_SIZE: usize = 500;
const SEARCH_LIMIT: usize = 25;

/// Refresh tunables.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// How old the mirror may get before `is_stale` reports true.
    pub staleness_interval: Duration,
    /// Rank tier labels worth tracking. Entries whose rank names none of
    /// these count as below-tracked for the early-stop rule.
    pub tracked_ranks: Vec<String>,
    /// Consecutive below-tracked entries before the sweep stops early.
    pub early_stop_threshold: usize,
    /// Hard cap on the sweep's pagination offset.
    pub max_offset: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            staleness_interval: Duration::from_secs(7 * 24 * 60 * 60),
            tracked_ranks: vec!["Diamond".to_string(), "Platinum".to_string()],
            early_stop_threshold: 50,
            max_offset: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingStats {
    pub entries: u64,
    /// Unix seconds of the last completed refresh, if any.
    pub refreshed_at: Option<i64>,
}

/// Database-backed mirror of the provider's faction ranking listing.
#[derive(Clone)]
pub struct RankingCache {
    db: DatabaseConnection,
    api: ApiClient,
    config: RankingConfig,
}

impl RankingCache {
    pub fn new(db: DatabaseConnection, api: ApiClient, config: RankingConfig) -> Self {
        Self { db, api, config }
    }

    /// Whether the mirror is empty or older than the staleness interval.
    pub async fn is_stale(&self, now: i64) -> Result<bool, Error> {
        match self.refreshed_at().await? {
            Some(refreshed_at) => {
                Ok(now - refreshed_at >= self.config.staleness_interval.as_secs() as i64)
            }
            None => Ok(true),
        }
    }

    pub async fn refreshed_at(&self) -> Result<Option<i64>, Error> {
        let meta = entity::prelude::RankingMeta::find_by_id(META_ROW_ID)
            .one(&self.db)
            .await?;
        Ok(meta.map(|m| m.refreshed_at))
    }

    /// Sweeps the provider's ranking listing and replaces the mirror
    /// wholesale. Only entries at a tracked tier are stored; the sweep stops
    /// early once a run of consecutive entries falls below every tracked
    /// tier, or when the offset cap is hit.
    pub async fn refresh(&self, now: i64) -> Result<usize, Error> {
        tracing::info!("Refreshing faction ranking directory");

        let entries = self.sweep().await?;
        let count = entries.len();

        let txn = self.db.begin().await?;

        entity::prelude::RankingFaction::delete_many().exec(&txn).await?;

        for chunk in entries.chunks(INSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|entry| entity::ranking_faction::ActiveModel {
                faction_id: ActiveValue::Set(entry.id),
                name: ActiveValue::Set(entry.name.clone()),
                members: ActiveValue::Set(entry.members),
                position: ActiveValue::Set(entry.position),
                rank: ActiveValue::Set(entry.rank.clone()),
            });
            entity::prelude::RankingFaction::insert_many(models)
                .exec_without_returning(&txn)
                .await?;
        }

        let meta = entity::ranking_meta::ActiveModel {
            id: ActiveValue::Set(META_ROW_ID),
            refreshed_at: ActiveValue::Set(now),
        };
        entity::prelude::RankingMeta::insert(meta)
            .on_conflict(
                migration::OnConflict::column(entity::ranking_meta::Column::Id)
                    .update_columns([entity::ranking_meta::Column::RefreshedAt])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(entries = count, "Ranking directory refreshed");

        Ok(count)
    }

    /// Refreshes only when stale. Returns whether a refresh ran.
    pub async fn refresh_if_stale(&self, now: i64) -> Result<bool, Error> {
        if !self.is_stale(now).await? {
            return Ok(false);
        }
        self.refresh(now).await?;
        Ok(true)
    }

    async fn sweep(&self) -> Result<Vec<RankingEntry>, Error> {
        let mut kept: Vec<RankingEntry> = Vec::new();
        let mut below_streak: usize = 0;
        let mut offset: u64 = 0;
        let page_size = self.api.config().ranking_page_size;
        let max_entries = self.api.config().max_ranking_entries;
        let page_delay = self.api.config().page_fetch_delay;

        loop {
            tracing::debug!(offset, collected = kept.len(), "Fetching ranking page");
            let page = self.api.fetch_ranking_page(offset, page_size).await?;
            if page.entries.is_empty() {
                break;
            }

            let has_next = page.has_next();
            for entry in page.entries {
                if self.is_below_tracked(&entry.rank) {
                    below_streak += 1;
                    if below_streak >= self.config.early_stop_threshold {
                        tracing::debug!(
                            streak = below_streak,
                            collected = kept.len(),
                            "Ranking sweep stopped early below tracked tiers"
                        );
                        return Ok(kept);
                    }
                    continue;
                }

                below_streak = 0;
                kept.push(entry);
            }

            offset += page_size as u64;
            if !has_next || offset > self.config.max_offset || kept.len() >= max_entries {
                break;
            }

            tokio::time::sleep(page_delay).await;
        }

        Ok(kept)
    }

    fn is_below_tracked(&self, rank: &str) -> bool {
        !self
            .config
            .tracked_ranks
            .iter()
            .any(|tier| rank.to_ascii_lowercase().contains(&tier.to_ascii_lowercase()))
    }

    /// Mirror entries matching a rank tier, optionally bounded by member
    /// count, in listing order.
    pub async fn get_by_rank(
        &self,
        rank: &str,
        min_members: Option<i32>,
        max_members: Option<i32>,
    ) -> Result<Vec<entity::ranking_faction::Model>, Error> {
        let mut query = entity::prelude::RankingFaction::find()
            .filter(entity::ranking_faction::Column::Rank.contains(rank));

        if let Some(min) = min_members {
            query = query.filter(entity::ranking_faction::Column::Members.gte(min));
        }
        if let Some(max) = max_members {
            query = query.filter(entity::ranking_faction::Column::Members.lte(max));
        }

        Ok(query
            .order_by_asc(entity::ranking_faction::Column::Position)
            .all(&self.db)
            .await?)
    }

    /// Name search over the mirror. Exact matches sort before prefix matches,
    /// then listing order.
    pub async fn search(&self, query: &str) -> Result<Vec<entity::ranking_faction::Model>, Error> {
        let pattern = LikeExpr::new(format!("%{}%", escape_like(query))).escape('\\');

        let condition = match query.parse::<i64>() {
            Ok(id) => Condition::any()
                .add(entity::ranking_faction::Column::Name.like(pattern))
                .add(entity::ranking_faction::Column::FactionId.eq(id)),
            Err(_) => {
                Condition::any().add(entity::ranking_faction::Column::Name.like(pattern))
            }
        };

        let mut matches = entity::prelude::RankingFaction::find()
            .filter(condition)
            .limit((SEARCH_LIMIT * 4) as u64)
            .all(&self.db)
            .await?;

        let needle = query.to_lowercase();
        matches.sort_by_cached_key(|m| {
            let name = m.name.to_lowercase();
            let tier = if name == needle {
                0
            } else if name.starts_with(&needle) {
                1
            } else {
                2
            };
            (tier, m.position)
        });
        matches.truncate(SEARCH_LIMIT);

        Ok(matches)
    }

    pub async fn get_by_id(
        &self,
        faction_id: i64,
    ) -> Result<Option<entity::ranking_faction::Model>, Error> {
        Ok(entity::prelude::RankingFaction::find_by_id(faction_id)
            .one(&self.db)
            .await?)
    }

    pub async fn stats(&self) -> Result<RankingStats, Error> {
        Ok(RankingStats {
            entries: entity::prelude::RankingFaction::find().count(&self.db).await?,
            refreshed_at: self.refreshed_at().await?,
        })
    }
}
