//! Tests for ApiClient::fetch_faction against a mock upstream.

use mockito::Matcher;

use factionpulse_test_utils::constant::{TEST_FACTION_ID, TEST_FACTION_NAME};
use factionpulse_test_utils::payload;
use factionpulse_test_utils::prelude::*;

use crate::setup::api_client;

#[tokio::test]
async fn fetches_and_parses_member_payload() {
    let mut setup = TestSetup::new().await.expect("test setup");
    let client = api_client(&setup, &[("testkey00000AAAA", 50)]);

    let body = payload::faction_payload(
        TEST_FACTION_NAME,
        &[(101, "Alice", 1_705_321_900), (102, "Bob", 1_000)],
    );
    let mock = setup
        .server
        .mock("GET", format!("/faction/{TEST_FACTION_ID}").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let result = client.fetch_faction(TEST_FACTION_ID).await.expect("fetch");

    mock.assert_async().await;
    assert_eq!(result.name, TEST_FACTION_NAME);
    assert_eq!(result.members.len(), 2);

    let snapshot = result.activity_snapshot(1_705_321_950);
    assert_eq!(snapshot.active, vec![101]);
    assert_eq!(snapshot.total, 2);
}

#[tokio::test]
async fn appends_key_as_query_parameter() {
    let mut setup = TestSetup::new().await.expect("test setup");
    let client = api_client(&setup, &[("testkey00000AAAA", 50)]);

    let mock = setup
        .server
        .mock("GET", format!("/faction/{TEST_FACTION_ID}").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("selections".into(), "basic".into()),
            Matcher::UrlEncoded("key".into(), "testkey00000AAAA".into()),
        ]))
        .with_status(200)
        .with_body(payload::faction_payload(TEST_FACTION_NAME, &[]).to_string())
        .create_async()
        .await;

    client.fetch_faction(TEST_FACTION_ID).await.expect("fetch");

    mock.assert_async().await;
}

#[tokio::test]
async fn ip_ban_propagates_without_retry() {
    let mut setup = TestSetup::new().await.expect("test setup");
    let client = api_client(&setup, &[("testkey00000AAAA", 50), ("testkey00000BBBB", 50)]);

    let mock = setup
        .server
        .mock("GET", format!("/faction/{TEST_FACTION_ID}").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(payload::error_payload(8, "IP block").to_string())
        .expect(1)
        .create_async()
        .await;

    let err = client
        .fetch_faction(TEST_FACTION_ID)
        .await
        .expect_err("should fail");

    mock.assert_async().await;
    assert!(err.to_string().contains("banned"));
    // Neither key is at fault; the pool stays clean.
    assert!(!client.limiter().is_quarantined("testkey00000AAAA"));
    assert!(!client.limiter().is_quarantined("testkey00000BBBB"));
}
