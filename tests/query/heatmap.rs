//! Tests for heatmap queries over stored snapshots.

use factionpulse::data::SnapshotStore;
use factionpulse::query::{AggregationQueries, DayFilter, Granularity, QueryCacheConfig};

use factionpulse_test_utils::constant::{TEST_FACTION_ID, TEST_FACTION_NAME, TEST_SLOT_TIMESTAMP};
use factionpulse_test_utils::prelude::*;

const WEEK: i64 = 7 * 24 * 60 * 60;

fn roster() -> Vec<(i64, String)> {
    (1..=5).map(|id| (id, format!("Member{id}"))).collect()
}

async fn seeded_queries(setup: &TestSetup) -> AggregationQueries {
    let store = SnapshotStore::new(setup.db.clone());

    // Same Monday 12:30 slot across two weeks, one 13:30 slot, one Sunday.
    let writes = [
        (TEST_SLOT_TIMESTAMP, vec![1i64, 2, 3]),
        (TEST_SLOT_TIMESTAMP + WEEK, vec![1i64]),
        (TEST_SLOT_TIMESTAMP + 3_600, vec![1i64, 2]),
        (TEST_SLOT_TIMESTAMP - 24 * 60 * 60, vec![4i64]),
    ];
    for (ts, active) in writes {
        store
            .add_snapshot(TEST_FACTION_ID, TEST_FACTION_NAME, ts, &active, 5, &roster())
            .await
            .expect("add snapshot");
    }

    AggregationQueries::new(store, QueryCacheConfig::default())
}

#[tokio::test]
async fn faction_heatmap_averages_bucket_sums() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let queries = seeded_queries(&setup).await;

    let now = TEST_SLOT_TIMESTAMP + 2 * WEEK;
    let cells = queries
        .faction_heatmap(
            TEST_FACTION_ID,
            30,
            &DayFilter::All,
            Granularity::QuarterHour,
            now,
        )
        .await
        .expect("heatmap");

    let monday_1230 = cells
        .iter()
        .find(|c| c.day_of_week == 1 && c.hour == 12 && c.slot == Some(2))
        .expect("bucket");
    assert_eq!(monday_1230.samples, 2);
    assert!((monday_1230.average_active - 2.0).abs() < f64::EPSILON);

    let monday_1330 = cells
        .iter()
        .find(|c| c.day_of_week == 1 && c.hour == 13 && c.slot == Some(2))
        .expect("bucket");
    assert_eq!(monday_1330.samples, 1);
    assert!((monday_1330.average_active - 2.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn faction_heatmap_respects_day_filter() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let queries = seeded_queries(&setup).await;

    let now = TEST_SLOT_TIMESTAMP + 2 * WEEK;
    let weekdays = queries
        .faction_heatmap(
            TEST_FACTION_ID,
            30,
            &DayFilter::Weekdays,
            Granularity::Hourly,
            now,
        )
        .await
        .expect("heatmap");

    assert!(!weekdays.is_empty());
    assert!(weekdays.iter().all(|c| (1..=5).contains(&c.day_of_week)));

    let weekend = queries
        .faction_heatmap(
            TEST_FACTION_ID,
            30,
            &DayFilter::Weekend,
            Granularity::Hourly,
            now,
        )
        .await
        .expect("heatmap");

    // Only the Sunday snapshot lands on a weekend.
    assert_eq!(weekend.len(), 1);
    assert_eq!(weekend[0].day_of_week, 0);
}

#[tokio::test]
async fn member_heatmap_counts_weeks_not_snapshots() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let queries = seeded_queries(&setup).await;

    let now = TEST_SLOT_TIMESTAMP + 2 * WEEK;

    // Member 1 was active in the Monday 12:30 slot both observed weeks.
    let cells = queries
        .member_heatmap(
            1,
            TEST_FACTION_ID,
            30,
            &DayFilter::All,
            Granularity::QuarterHour,
            now,
        )
        .await
        .expect("heatmap");

    let monday_1230 = cells
        .iter()
        .find(|c| c.day_of_week == 1 && c.hour == 12 && c.slot == Some(2))
        .expect("bucket");
    assert_eq!(monday_1230.weeks_observed, 2);
    assert!((monday_1230.active_percentage - 100.0).abs() < f64::EPSILON);

    // Member 2 was active there in only one of the two weeks.
    let cells = queries
        .member_heatmap(
            2,
            TEST_FACTION_ID,
            30,
            &DayFilter::All,
            Granularity::QuarterHour,
            now,
        )
        .await
        .expect("heatmap");

    let monday_1230 = cells
        .iter()
        .find(|c| c.day_of_week == 1 && c.hour == 12 && c.slot == Some(2))
        .expect("bucket");
    assert_eq!(monday_1230.weeks_observed, 2);
    assert!((monday_1230.active_percentage - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn combined_member_heatmap_merges_factions_by_slot() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    // Member 1 is sighted in two factions. In the second slot they are
    // inactive in faction 100 but active in faction 200; the merged view
    // must treat the slot as active.
    store
        .add_snapshot(100, "First Home", TEST_SLOT_TIMESTAMP, &[1], 5, &roster())
        .await
        .expect("add snapshot");
    store
        .add_snapshot(100, "First Home", TEST_SLOT_TIMESTAMP + 900, &[2], 5, &roster())
        .await
        .expect("add snapshot");
    store
        .add_snapshot(200, "Second Home", TEST_SLOT_TIMESTAMP + 900, &[1], 5, &roster())
        .await
        .expect("add snapshot");

    let queries = AggregationQueries::new(store, QueryCacheConfig::default());
    let cells = queries
        .member_heatmap_combined(
            1,
            30,
            &DayFilter::All,
            Granularity::QuarterHour,
            TEST_SLOT_TIMESTAMP + 3_600,
        )
        .await
        .expect("heatmap");

    // Both Monday 12:30 and 12:45 slots show full activity.
    assert_eq!(cells.len(), 2);
    for cell in &cells {
        assert_eq!(cell.weeks_observed, 1);
        assert!((cell.active_percentage - 100.0).abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn cached_heatmap_invalidates_when_new_snapshot_lands() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    store
        .add_snapshot(
            TEST_FACTION_ID,
            TEST_FACTION_NAME,
            TEST_SLOT_TIMESTAMP,
            &[1, 2],
            5,
            &roster(),
        )
        .await
        .expect("add snapshot");

    let queries = AggregationQueries::new(store.clone(), QueryCacheConfig::default());
    let now = TEST_SLOT_TIMESTAMP + 3_600;

    let first = queries
        .faction_heatmap(TEST_FACTION_ID, 30, &DayFilter::All, Granularity::Hourly, now)
        .await
        .expect("heatmap");
    assert_eq!(first.len(), 1);

    // New data moves the faction's data timestamp; the cached result must
    // not be served.
    store
        .add_snapshot(
            TEST_FACTION_ID,
            TEST_FACTION_NAME,
            TEST_SLOT_TIMESTAMP + 900,
            &[1, 2, 3, 4],
            5,
            &roster(),
        )
        .await
        .expect("add snapshot");

    let second = queries
        .faction_heatmap(TEST_FACTION_ID, 30, &DayFilter::All, Granularity::Hourly, now)
        .await
        .expect("heatmap");

    assert_eq!(second[0].samples, 2);
    assert!((second[0].average_active - 3.0).abs() < f64::EPSILON);
}
