//! Tests for SnapshotStore's transactional snapshot writes and reads.

use factionpulse::data::SnapshotStore;

use factionpulse_test_utils::constant::{TEST_FACTION_ID, TEST_FACTION_NAME, TEST_SLOT_TIMESTAMP};
use factionpulse_test_utils::prelude::*;

fn names(ids: &[i64]) -> Vec<(i64, String)> {
    ids.iter().map(|id| (*id, format!("Member{id}"))).collect()
}

#[tokio::test]
async fn snapshot_round_trips_with_member_set() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    let roster = names(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    store
        .add_snapshot(
            TEST_FACTION_ID,
            TEST_FACTION_NAME,
            TEST_SLOT_TIMESTAMP,
            &[1, 2, 3],
            10,
            &roster,
        )
        .await
        .expect("add snapshot");

    let snapshots = store
        .get_snapshots_since(TEST_FACTION_ID, 0)
        .await
        .expect("read back");

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].timestamp, TEST_SLOT_TIMESTAMP);
    assert_eq!(snapshots[0].total, 10);
    let mut active = snapshots[0].active.clone();
    active.sort_unstable();
    assert_eq!(active, vec![1, 2, 3]);

    // The faction row was upserted alongside.
    let faction = store
        .get_faction(TEST_FACTION_ID)
        .await
        .expect("query")
        .expect("faction exists");
    assert_eq!(faction.name, TEST_FACTION_NAME);
    assert_eq!(faction.last_updated, TEST_SLOT_TIMESTAMP);
}

#[tokio::test]
async fn aggregates_accumulate_additively() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    // Two snapshots in the same 12:30 bucket on consecutive Mondays, plus
    // one in a different hour.
    let week = 7 * 24 * 60 * 60;
    let roster = names(&[1, 2, 3, 4, 5]);
    for (ts, active) in [
        (TEST_SLOT_TIMESTAMP, vec![1i64, 2, 3]),
        (TEST_SLOT_TIMESTAMP + week, vec![1i64]),
        (TEST_SLOT_TIMESTAMP + 3_600, vec![1i64, 2, 3, 4, 5]),
    ] {
        store
            .add_snapshot(TEST_FACTION_ID, TEST_FACTION_NAME, ts, &active, 5, &roster)
            .await
            .expect("add snapshot");
    }

    let buckets = store
        .get_quarter_hour_aggregates(TEST_FACTION_ID, "2024-01-01")
        .await
        .expect("aggregates");

    // Monday = 1; 12:30 is hour 12 slot 2, 13:30 is hour 13 slot 2.
    let twelve = buckets
        .iter()
        .find(|b| b.day_of_week == 1 && b.hour == 12 && b.slot == 2)
        .expect("12:30 bucket");
    assert_eq!(twelve.active_sum, Some(4));
    assert_eq!(twelve.snapshot_count, Some(2));

    let thirteen = buckets
        .iter()
        .find(|b| b.day_of_week == 1 && b.hour == 13 && b.slot == 2)
        .expect("13:30 bucket");
    assert_eq!(thirteen.active_sum, Some(5));
    assert_eq!(thirteen.snapshot_count, Some(1));
}

#[tokio::test]
async fn hourly_aggregates_merge_sub_slots() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    let roster = names(&[1, 2, 3]);
    for (offset, active) in [(0i64, vec![1i64, 2]), (900, vec![1i64, 2, 3])] {
        store
            .add_snapshot(
                TEST_FACTION_ID,
                TEST_FACTION_NAME,
                TEST_SLOT_TIMESTAMP + offset,
                &active,
                3,
                &roster,
            )
            .await
            .expect("add snapshot");
    }

    let buckets = store
        .get_hourly_aggregates(TEST_FACTION_ID, "2024-01-01")
        .await
        .expect("aggregates");

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].hour, 12);
    assert_eq!(buckets[0].active_sum, Some(5));
    assert_eq!(buckets[0].snapshot_count, Some(2));
}

#[tokio::test]
async fn slot_existence_check_respects_tolerance() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    setup
        .insert_snapshot(TEST_FACTION_ID, TEST_SLOT_TIMESTAMP, 3, 10)
        .await
        .expect("insert");

    assert!(store
        .has_snapshot_for_slot(TEST_FACTION_ID, TEST_SLOT_TIMESTAMP, 60)
        .await
        .expect("query"));
    assert!(store
        .has_snapshot_for_slot(TEST_FACTION_ID, TEST_SLOT_TIMESTAMP + 45, 60)
        .await
        .expect("query"));
    assert!(!store
        .has_snapshot_for_slot(TEST_FACTION_ID, TEST_SLOT_TIMESTAMP + 900, 60)
        .await
        .expect("query"));
}

#[tokio::test]
async fn member_identities_and_associations_are_recorded() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    store
        .add_snapshot(
            TEST_FACTION_ID,
            TEST_FACTION_NAME,
            TEST_SLOT_TIMESTAMP,
            &[1],
            2,
            &names(&[1, 2]),
        )
        .await
        .expect("add snapshot");

    let member = store
        .get_member(1)
        .await
        .expect("query")
        .expect("member exists");
    assert_eq!(member.name, "Member1");
    assert_eq!(member.last_seen, TEST_SLOT_TIMESTAMP);

    // Only active members gain an association row.
    let history = store
        .get_member_faction_history(1)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].faction_id, TEST_FACTION_ID);
    assert_eq!(history[0].first_seen, TEST_SLOT_TIMESTAMP);
    assert!(store
        .get_member_faction_history(2)
        .await
        .expect("history")
        .is_empty());

    // A later sighting advances last-seen but keeps first-seen.
    store
        .add_snapshot(
            TEST_FACTION_ID,
            TEST_FACTION_NAME,
            TEST_SLOT_TIMESTAMP + 900,
            &[1],
            2,
            &names(&[1, 2]),
        )
        .await
        .expect("add snapshot");

    let history = store
        .get_member_faction_history(1)
        .await
        .expect("history");
    assert_eq!(history[0].first_seen, TEST_SLOT_TIMESTAMP);
    assert_eq!(history[0].last_seen, TEST_SLOT_TIMESTAMP + 900);
}

#[tokio::test]
async fn inactivity_needs_low_average_and_low_peak() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    let now = TEST_SLOT_TIMESTAMP + 24 * 60 * 60;

    // Faction 1: quiet throughout.
    for i in 0..4 {
        setup
            .insert_snapshot(1, TEST_SLOT_TIMESTAMP + i * 900, 1, 20)
            .await
            .expect("insert");
    }
    // Faction 2: low average but one burst above the peak threshold.
    for (i, active) in [0, 0, 6, 0].iter().enumerate() {
        setup
            .insert_snapshot(2, TEST_SLOT_TIMESTAMP + i as i64 * 900, *active, 20)
            .await
            .expect("insert");
    }

    assert!(store.is_inactive_faction(1, now).await.expect("query"));
    assert!(!store.is_inactive_faction(2, now).await.expect("query"));
    // No snapshots at all is not evidence of inactivity.
    assert!(!store.is_inactive_faction(3, now).await.expect("query"));
}

#[tokio::test]
async fn member_search_ranks_exact_before_prefix() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    setup.insert_member(1, "Ann").await.expect("insert");
    setup.insert_member(2, "Annabel").await.expect("insert");
    setup.insert_member(3, "Joanne").await.expect("insert");

    let results = store.search_members("Ann", 25).await.expect("search");

    let names: Vec<&str> = results.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Ann", "Annabel", "Joanne"]);
}

#[tokio::test]
async fn member_search_treats_wildcard_characters_literally() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    setup.insert_member(1, "Ann").await.expect("insert");
    setup.insert_member(2, "A_n").await.expect("insert");

    let results = store.search_members("A_", 25).await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "A_n");
}
