//! Tests for full collection cycles against a mock upstream.

use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use mockito::Matcher;

use factionpulse::api::ApiClient;
use factionpulse::api::ratelimit::{RateLimitConfig, RateLimiter};
use factionpulse::collector::Collector;
use factionpulse::collector::config::CollectorConfig;
use factionpulse::collector::slot;
use factionpulse::data::SnapshotStore;
use factionpulse::ranking::{RankingCache, RankingConfig};

use factionpulse_test_utils::payload;
use factionpulse_test_utils::prelude::*;

use crate::setup::{credential, quick_api_config};

fn collector_for(setup: &TestSetup, keys: &[(&str, u32)]) -> Arc<Collector> {
    let credentials = keys.iter().map(|(k, l)| credential(k, *l)).collect();
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default(), credentials));
    let api = ApiClient::new(quick_api_config(&setup.api_url()), limiter);

    let store = SnapshotStore::new(setup.db.clone());
    let ranking = RankingCache::new(setup.db.clone(), api.clone(), RankingConfig::default());

    Arc::new(Collector::new(
        store,
        api,
        ranking,
        CollectorConfig {
            prune_probability: 0.0,
            ..Default::default()
        },
    ))
}

#[tokio::test]
async fn cycle_collects_every_tracked_faction() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    let faction_count = 50;
    let now = Utc::now().timestamp();
    let mut mocks = Vec::new();
    for i in 0..faction_count {
        let faction_id = 1_000 + i;
        setup
            .insert_tracked_faction(faction_id, &format!("Faction {faction_id}"))
            .await
            .expect("insert faction");

        let body = payload::faction_payload(
            &format!("Faction {faction_id}"),
            &[(faction_id * 10, "Someone", now)],
        );
        mocks.push(
            setup
                .server
                .mock("GET", format!("/faction/{faction_id}").as_str())
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(body.to_string())
                .create_async()
                .await,
        );
    }

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100), ("testkey00000BBBB", 100)]);

    let result = collector
        .collect_once()
        .await
        .expect("cycle")
        .expect("cycle ran");

    assert_eq!(result.success, 50);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());
    for mock in &mocks {
        mock.assert_async().await;
    }

    // Every faction got a snapshot for the current slot.
    let store = SnapshotStore::new(setup.db.clone());
    let slot_ts = slot::slot_start(now);
    for i in 0..faction_count {
        assert!(
            store
                .has_snapshot_for_slot(1_000 + i, slot_ts, 60)
                .await
                .expect("query"),
            "faction {} missing its snapshot",
            1_000 + i
        );
    }
}

#[tokio::test]
async fn failed_faction_does_not_abort_the_cycle() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Good").await.expect("insert");
    setup.insert_tracked_faction(2, "Broken").await.expect("insert");

    let now = Utc::now().timestamp();
    let good = setup
        .server
        .mock("GET", "/faction/1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::faction_payload("Good", &[(11, "A", now)]).to_string())
        .create_async()
        .await;
    let broken = setup
        .server
        .mock("GET", "/faction/2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::error_payload(7, "Incorrect ID-entity relation").to_string())
        .create_async()
        .await;

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);

    let result = collector
        .collect_once()
        .await
        .expect("cycle")
        .expect("cycle ran");

    good.assert_async().await;
    broken.assert_async().await;
    assert_eq!(result.success, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].faction_id, 2);
}

#[tokio::test]
async fn factions_with_current_snapshot_are_not_repolled() {
    let setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Covered").await.expect("insert");

    let now = Utc::now().timestamp();
    setup
        .insert_snapshot(1, slot::slot_start(now), 3, 10)
        .await
        .expect("insert snapshot");

    // No mock endpoints registered: any poll would fail the cycle.
    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);

    let result = collector
        .collect_once()
        .await
        .expect("cycle")
        .expect("cycle ran");

    assert_eq!(result.success, 0);
    assert_eq!(result.failed, 0);
}

#[tokio::test]
async fn all_keys_bad_marks_factions_failed() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Unlucky").await.expect("insert");

    let mock = setup
        .server
        .mock("GET", "/faction/1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::error_payload(2, "Incorrect key").to_string())
        .create_async()
        .await;

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);

    let result = collector
        .collect_once()
        .await
        .expect("cycle")
        .expect("cycle ran");

    mock.assert_async().await;
    assert_eq!(result.failed, 1);
    assert!(result.errors[0].error.contains("failed"));
}

#[tokio::test]
async fn snapshot_total_counts_the_full_roster() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Odd").await.expect("insert");

    // One roster id is not numeric; it still counts toward the total.
    let now = Utc::now().timestamp();
    let body = serde_json::json!({
        "name": "Odd",
        "members": {
            "11": { "name": "A", "last_action": { "timestamp": now } },
            "not-an-id": { "name": "B", "last_action": { "timestamp": now } },
        }
    });
    let mock = setup
        .server
        .mock("GET", "/faction/1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);
    let result = collector.collect_once().await.expect("cycle").expect("ran");

    mock.assert_async().await;
    assert_eq!(result.success, 1);

    let store = SnapshotStore::new(setup.db.clone());
    let snapshot = store
        .get_latest_snapshot(1)
        .await
        .expect("query")
        .expect("snapshot exists");
    assert_eq!(snapshot.total_count, 2);
    assert_eq!(snapshot.active_count, 1);
}

#[tokio::test]
async fn stop_returns_once_the_inflight_cycle_drains() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Slow").await.expect("insert");

    let now = Utc::now().timestamp();
    let body = payload::faction_payload("Slow", &[(11, "A", now)]).to_string();
    let mock = setup
        .server
        .mock("GET", "/faction/1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_chunked_body(move |w| {
            std::thread::sleep(std::time::Duration::from_millis(200));
            w.write_all(body.as_bytes())
        })
        .create_async()
        .await;

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);

    let cycle = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move { collector.collect_once().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let started = std::time::Instant::now();
    collector.stop().await.expect("stop");
    // Well under the shutdown timeout: stop wakes as soon as the cycle ends.
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    mock.assert_async().await;
    let result = cycle.await.expect("join").expect("cycle").expect("ran");
    assert_eq!(result.success, 1);
}

#[tokio::test]
async fn second_cycle_is_a_no_op_for_the_same_slot() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    setup.insert_tracked_faction(1, "Once").await.expect("insert");

    let now = Utc::now().timestamp();
    let mock = setup
        .server
        .mock("GET", "/faction/1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::faction_payload("Once", &[(11, "A", now)]).to_string())
        .expect(1)
        .create_async()
        .await;

    let collector = collector_for(&setup, &[("testkey00000AAAA", 100)]);

    let first = collector.collect_once().await.expect("cycle").expect("ran");
    let second = collector.collect_once().await.expect("cycle").expect("ran");

    mock.assert_async().await;
    assert_eq!(first.success, 1);
    assert_eq!(second.success, 0);
    assert_eq!(second.failed, 0);

    let store = SnapshotStore::new(setup.db.clone());
    assert_eq!(store.get_snapshot_count(1).await.expect("count"), 1);
}
