//! Tests for the ranking directory mirror.

use std::time::Duration;

use mockito::Matcher;

use factionpulse::ranking::{RankingCache, RankingConfig};

use factionpulse_test_utils::payload;
use factionpulse_test_utils::prelude::*;

use crate::setup::api_client;

fn cache_for(setup: &TestSetup, config: RankingConfig) -> RankingCache {
    let api = api_client(setup, &[("testkey00000AAAA", 100)]);
    RankingCache::new(setup.db.clone(), api, config)
}

#[tokio::test]
async fn refresh_mirrors_paginated_listing() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    let page_one = setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "0".into()),
            Matcher::UrlEncoded("cat".into(), "rank".into()),
        ]))
        .with_status(200)
        .with_body(
            payload::ranking_page(
                &[
                    (10, "Apex", 90, 1, "Diamond I"),
                    (11, "Vanguard", 85, 2, "Diamond II"),
                ],
                true,
            )
            .to_string(),
        )
        .create_async()
        .await;
    let page_two = setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "100".into()),
            Matcher::UrlEncoded("cat".into(), "rank".into()),
        ]))
        .with_status(200)
        .with_body(
            payload::ranking_page(&[(12, "Bulwark", 60, 3, "Platinum I")], false).to_string(),
        )
        .create_async()
        .await;

    let cache = cache_for(&setup, RankingConfig::default());

    let now = 1_705_321_800;
    assert!(cache.is_stale(now).await.expect("staleness"));

    let count = cache.refresh(now).await.expect("refresh");

    page_one.assert_async().await;
    page_two.assert_async().await;
    assert_eq!(count, 3);
    assert!(!cache.is_stale(now).await.expect("staleness"));
    assert_eq!(cache.stats().await.expect("stats").entries, 3);

    let apex = cache
        .get_by_id(10)
        .await
        .expect("query")
        .expect("entry exists");
    assert_eq!(apex.name, "Apex");
    assert_eq!(apex.position, 1);
}

#[tokio::test]
async fn sweep_stops_after_run_of_low_tier_entries() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    // Page one ends in low tiers and advertises more pages; a threshold of
    // three consecutive low-tier entries must stop the sweep before page two.
    let page = [
        (100, "F0", 50, 1, "Diamond I"),
        (101, "F1", 40, 2, "Platinum II"),
        (102, "F2", 30, 3, "Gold I"),
        (103, "F3", 20, 4, "Silver III"),
        (104, "F4", 10, 5, "Bronze I"),
    ];

    let page_one = setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
        .with_status(200)
        .with_body(payload::ranking_page(&page, true).to_string())
        .expect(1)
        .create_async()
        .await;
    let page_two = setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::UrlEncoded("offset".into(), "100".into()))
        .expect(0)
        .create_async()
        .await;

    let cache = cache_for(
        &setup,
        RankingConfig {
            early_stop_threshold: 3,
            ..Default::default()
        },
    );

    let count = cache.refresh(1_705_321_800).await.expect("refresh");

    page_one.assert_async().await;
    page_two.assert_async().await;
    // Low-tier entries advance the stop counter but are not stored.
    assert_eq!(count, 2);
    assert_eq!(cache.stats().await.expect("stats").entries, 2);
    assert!(cache.get_by_id(102).await.expect("query").is_none());
}

#[tokio::test]
async fn rank_lookup_filters_by_member_count() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    let page = [
        (10, "Big", 95, 1, "Diamond I"),
        (11, "Mid", 60, 2, "Diamond II"),
        (12, "Small", 20, 3, "Diamond III"),
        (13, "Other", 50, 4, "Platinum I"),
    ];
    setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::ranking_page(&page, false).to_string())
        .create_async()
        .await;

    let cache = cache_for(&setup, RankingConfig::default());
    cache.refresh(1_705_321_800).await.expect("refresh");

    let diamonds = cache
        .get_by_rank("Diamond", Some(30), Some(90))
        .await
        .expect("query");

    assert_eq!(diamonds.len(), 1);
    assert_eq!(diamonds[0].name, "Mid");
}

#[tokio::test]
async fn search_treats_wildcard_characters_literally() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    let page = [
        (10, "Apex", 90, 1, "Diamond I"),
        (11, "A%ex", 85, 2, "Diamond II"),
    ];
    setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::ranking_page(&page, false).to_string())
        .create_async()
        .await;

    let cache = cache_for(&setup, RankingConfig::default());
    cache.refresh(1_705_321_800).await.expect("refresh");

    let results = cache.search("A%").await.expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "A%ex");
}

#[tokio::test]
async fn stale_mirror_refreshes_and_fresh_mirror_does_not() {
    let mut setup = test_setup_with_all_tables!().expect("test setup");

    let mock = setup
        .server
        .mock("GET", "/v2/torn/factionhof")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::ranking_page(&[(10, "Apex", 90, 1, "Diamond I")], false).to_string())
        .expect(1)
        .create_async()
        .await;

    let cache = cache_for(
        &setup,
        RankingConfig {
            staleness_interval: Duration::from_secs(3_600),
            ..Default::default()
        },
    );

    let now = 1_705_321_800;
    assert!(cache.refresh_if_stale(now).await.expect("first check"));
    // Within the interval nothing happens.
    assert!(!cache.refresh_if_stale(now + 60).await.expect("second check"));
    mock.assert_async().await;
}
