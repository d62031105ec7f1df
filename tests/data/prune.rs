//! Tests for retention pruning.

use factionpulse::data::SnapshotStore;

use factionpulse_test_utils::constant::{TEST_FACTION_ID, TEST_SLOT_TIMESTAMP};
use factionpulse_test_utils::prelude::*;

const DAY: i64 = 24 * 60 * 60;

#[tokio::test]
async fn prune_removes_only_expired_snapshots() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    let now = TEST_SLOT_TIMESTAMP;
    let expired = setup
        .insert_snapshot(TEST_FACTION_ID, now - 31 * DAY, 3, 10)
        .await
        .expect("insert");
    setup
        .insert_snapshot(TEST_FACTION_ID, now - 29 * DAY, 4, 10)
        .await
        .expect("insert");
    setup
        .insert_snapshot(TEST_FACTION_ID, now, 5, 10)
        .await
        .expect("insert");

    // Membership rows on the expired snapshot must go with it.
    use sea_orm::{ActiveValue, EntityTrait};
    entity::prelude::SnapshotMember::insert(entity::snapshot_member::ActiveModel {
        snapshot_id: ActiveValue::Set(expired),
        member_id: ActiveValue::Set(7),
    })
    .exec_without_returning(&setup.db)
    .await
    .expect("insert member row");

    let before = store.get_db_stats().await.expect("stats");
    let deleted = store.prune_old_data(30, now).await.expect("prune");
    let after = store.get_db_stats().await.expect("stats");

    assert_eq!(deleted, 1);
    assert_eq!(after.snapshots, before.snapshots - 1);

    let remaining = store
        .get_snapshots_since(TEST_FACTION_ID, 0)
        .await
        .expect("read");
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|s| s.timestamp >= now - 30 * DAY));
    assert!(remaining.iter().all(|s| s.active.is_empty()));
}

#[tokio::test]
async fn prune_with_nothing_expired_is_a_no_op() {
    let setup = test_setup_with_all_tables!().expect("test setup");
    let store = SnapshotStore::new(setup.db.clone());

    setup
        .insert_snapshot(TEST_FACTION_ID, TEST_SLOT_TIMESTAMP, 3, 10)
        .await
        .expect("insert");

    let deleted = store
        .prune_old_data(30, TEST_SLOT_TIMESTAMP)
        .await
        .expect("prune");

    assert_eq!(deleted, 0);
    assert_eq!(
        store.get_snapshot_count(TEST_FACTION_ID).await.expect("count"),
        1
    );
}
