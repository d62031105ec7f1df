//! Slot-aligned collection engine.
//!
//! A cron schedule fires shortly after every 15-minute boundary; each firing
//! runs one collection cycle that polls every tracked faction once and writes
//! a snapshot for the slot. Cycles never overlap and a failed faction never
//! aborts the cycle.

pub mod config;
pub mod slot;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Notify;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::api::ApiClient;
use crate::collector::config::CollectorConfig;
use crate::data::SnapshotStore;
use crate::error::Error;
use crate::model::{CollectionResult, CollectorStatus, FactionError};
use crate::ranking::RankingCache;

/// Daily ranking staleness check, off the quarter-hour grid.
const RANKING_SCHEDULE: &str = "0 10 4 * * *";

/// Fires the configured number of seconds past each 15-minute boundary,
/// letting the provider's last-action data settle before polling.
fn collection_schedule(settle_delay_seconds: u64) -> String {
    format!("{settle_delay_seconds} 0,15,30,45 * * * *")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Collecting,
    ShuttingDown,
}

struct CollectorShared {
    state: Mutex<CycleState>,
    last_result: Mutex<Option<CollectionResult>>,
    cycle_done: Notify,
}

/// Owns the schedule and the per-cycle worker pool.
pub struct Collector {
    store: SnapshotStore,
    api: ApiClient,
    ranking: RankingCache,
    config: CollectorConfig,
    shared: Arc<CollectorShared>,
    scheduler: tokio::sync::Mutex<Option<JobScheduler>>,
}

impl Collector {
    pub fn new(
        store: SnapshotStore,
        api: ApiClient,
        ranking: RankingCache,
        config: CollectorConfig,
    ) -> Self {
        Self {
            store,
            api,
            ranking,
            config,
            shared: Arc::new(CollectorShared {
                state: Mutex::new(CycleState::Idle),
                last_result: Mutex::new(None),
                cycle_done: Notify::new(),
            }),
            scheduler: tokio::sync::Mutex::new(None),
        }
    }

    /// Starts the cron schedule and, when the current slot has no snapshot
    /// yet, kicks off an immediate catch-up cycle.
    pub async fn start(self: &Arc<Self>) -> Result<(), Error> {
        let scheduler = JobScheduler::new().await?;

        let schedule = collection_schedule(self.config.settle_delay_seconds);
        let collector = Arc::clone(self);
        scheduler
            .add(Job::new_async(schedule.as_str(), move |_id, _lock| {
                let collector = Arc::clone(&collector);
                Box::pin(async move {
                    if let Err(err) = collector.collect_once().await {
                        tracing::error!(error = %err, "Collection cycle failed");
                    }
                })
            })?)
            .await?;

        let collector = Arc::clone(self);
        scheduler
            .add(Job::new_async(RANKING_SCHEDULE, move |_id, _lock| {
                let collector = Arc::clone(&collector);
                Box::pin(async move {
                    let now = Utc::now().timestamp();
                    if let Err(err) = collector.ranking.refresh_if_stale(now).await {
                        tracing::error!(error = %err, "Ranking refresh failed");
                    }
                })
            })?)
            .await?;

        scheduler.start().await?;
        *self.scheduler.lock().await = Some(scheduler);

        tracing::info!(
            credentials = self.api.limiter().credential_count(),
            "Collector started"
        );

        if self.current_slot_needs_catch_up().await? {
            let collector = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(err) = collector.collect_once().await {
                    tracing::error!(error = %err, "Catch-up collection failed");
                }
            });
        }

        Ok(())
    }

    /// Stops the schedule and waits, bounded, for an in-flight cycle to
    /// drain. Workers observe the shutdown state and stop taking new work.
    pub async fn stop(&self) -> Result<(), Error> {
        // Register for the cycle-done signal before flipping state; a cycle
        // finishing in between would otherwise notify nobody.
        let cycle_done = self.shared.cycle_done.notified();
        tokio::pin!(cycle_done);
        cycle_done.as_mut().enable();

        let collecting = {
            let mut state = self.shared.state.lock().unwrap();
            let was_collecting = *state == CycleState::Collecting;
            *state = CycleState::ShuttingDown;
            was_collecting
        };

        if let Some(mut scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await?;
        }

        if collecting {
            tracing::info!("Waiting for in-flight collection cycle to finish");
            let timeout = self.config.shutdown_timeout();
            if tokio::time::timeout(timeout, cycle_done).await.is_err() {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Collection cycle did not drain in time"
                );
            }
        }

        tracing::info!("Collector stopped");
        Ok(())
    }

    /// Runs one collection cycle. Returns `None` without doing anything when
    /// a cycle is already running or the collector is shutting down.
    pub async fn collect_once(self: &Arc<Self>) -> Result<Option<CollectionResult>, Error> {
        {
            let mut state = self.shared.state.lock().unwrap();
            match *state {
                CycleState::Collecting => {
                    tracing::warn!("Collection cycle already running, skipping");
                    return Ok(None);
                }
                CycleState::ShuttingDown => return Ok(None),
                CycleState::Idle => *state = CycleState::Collecting,
            }
        }

        let result = self.run_cycle().await;

        {
            let mut state = self.shared.state.lock().unwrap();
            if *state == CycleState::Collecting {
                *state = CycleState::Idle;
            }
        }
        self.shared.cycle_done.notify_waiters();

        let result = result?;
        *self.shared.last_result.lock().unwrap() = Some(result.clone());
        Ok(Some(result))
    }

    async fn run_cycle(self: &Arc<Self>) -> Result<CollectionResult, Error> {
        let started_at = Utc::now().timestamp();
        let slot_timestamp = slot::slot_start(started_at);

        let mut result = CollectionResult {
            started_at,
            ..Default::default()
        };

        let queue = self.build_queue(slot_timestamp, &mut result.skipped).await?;
        if queue.is_empty() {
            tracing::debug!(slot = slot_timestamp, "Nothing to collect this slot");
            result.finished_at = Utc::now().timestamp();
            return Ok(result);
        }

        let worker_count = self
            .config
            .worker_count(self.api.limiter().credential_count());
        tracing::info!(
            slot = slot_timestamp,
            factions = queue.len(),
            workers = worker_count,
            "Starting collection cycle"
        );

        let queue = Arc::new(Mutex::new(queue));
        let outcomes: Arc<Mutex<Vec<Result<i64, FactionError>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let collector = Arc::clone(self);
            let queue = Arc::clone(&queue);
            let outcomes = Arc::clone(&outcomes);
            handles.push(tokio::spawn(async move {
                loop {
                    if collector.is_shutting_down() {
                        break;
                    }
                    let Some(faction_id) = queue.lock().unwrap().pop_front() else {
                        break;
                    };

                    let outcome = match collector.collect_faction(faction_id, slot_timestamp).await
                    {
                        Ok(()) => Ok(faction_id),
                        Err(err) => {
                            tracing::warn!(
                                faction_id,
                                error = %err,
                                "Faction collection failed"
                            );
                            Err(FactionError {
                                faction_id,
                                error: err.to_string(),
                            })
                        }
                    };
                    outcomes.lock().unwrap().push(outcome);
                }
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Collection worker panicked");
            }
        }

        for outcome in outcomes.lock().unwrap().drain(..) {
            match outcome {
                Ok(_) => result.success += 1,
                Err(err) => {
                    result.failed += 1;
                    result.errors.push(err);
                }
            }
        }
        result.finished_at = Utc::now().timestamp();

        tracing::info!(
            success = result.success,
            failed = result.failed,
            skipped = result.skipped,
            elapsed_secs = result.finished_at - result.started_at,
            "Collection cycle finished"
        );

        self.maybe_prune().await;

        Ok(result)
    }

    /// Tracked factions needing a snapshot this slot. Factions already
    /// covered are dropped; inactive ones are usually skipped, with an
    /// occasional poll through so a revival is still noticed.
    async fn build_queue(
        &self,
        slot_timestamp: i64,
        skipped: &mut usize,
    ) -> Result<VecDeque<i64>, Error> {
        let tracked = self.store.tracked_faction_ids().await?;
        let now = Utc::now().timestamp();

        let mut queue = VecDeque::with_capacity(tracked.len());
        for faction_id in tracked {
            if self
                .store
                .has_snapshot_for_slot(faction_id, slot_timestamp, self.config.slot_tolerance_seconds)
                .await?
            {
                continue;
            }

            if self.store.is_inactive_faction(faction_id, now).await?
                && rand::random::<f64>() < self.config.inactive_skip_probability
            {
                *skipped += 1;
                continue;
            }

            queue.push_back(faction_id);
        }

        Ok(queue)
    }

    /// Polls one faction and persists its snapshot for the slot.
    async fn collect_faction(&self, faction_id: i64, slot_timestamp: i64) -> Result<(), Error> {
        let payload = self.api.fetch_faction(faction_id).await?;
        let activity = payload.activity_snapshot(Utc::now().timestamp());

        self.store
            .add_snapshot(
                faction_id,
                &payload.name,
                slot_timestamp,
                &activity.active,
                activity.total,
                &payload.member_names(),
            )
            .await?;

        Ok(())
    }

    /// Retention pruning rides along with a small fraction of cycles rather
    /// than holding its own schedule.
    async fn maybe_prune(&self) {
        if rand::random::<f64>() >= self.config.prune_probability {
            return;
        }
        let now = Utc::now().timestamp();
        if let Err(err) = self.store.prune_old_data(self.config.retention_days, now).await {
            tracing::error!(error = %err, "Retention prune failed");
        }
    }

    pub async fn status(&self) -> Result<CollectorStatus, Error> {
        let now = Utc::now().timestamp();
        let (running, collecting) = {
            let state = self.shared.state.lock().unwrap();
            (
                *state != CycleState::ShuttingDown,
                *state == CycleState::Collecting,
            )
        };

        let faction_count = self.store.tracked_faction_ids().await?.len();
        let limiter = self.api.limiter();

        Ok(CollectorStatus {
            running: running && self.scheduler.lock().await.is_some(),
            collecting,
            faction_count,
            credential_count: limiter.credential_count(),
            estimated_collection_seconds: limiter.estimate_collection_time(faction_count),
            next_slot_eta_seconds: slot::next_slot_boundary(now) - now,
            last_collection: self.shared.last_result.lock().unwrap().clone(),
            credentials: limiter.usage_status().into_iter().map(Into::into).collect(),
        })
    }

    async fn current_slot_needs_catch_up(&self) -> Result<bool, Error> {
        let now = Utc::now().timestamp();
        let slot_timestamp = slot::slot_start(now);
        for faction_id in self.store.tracked_faction_ids().await? {
            if !self
                .store
                .has_snapshot_for_slot(faction_id, slot_timestamp, self.config.slot_tolerance_seconds)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_shutting_down(&self) -> bool {
        *self.shared.state.lock().unwrap() == CycleState::ShuttingDown
    }
}
