//! Single-flight behaviour of the key-set cache
//!
//! Call counts are asserted through wiremock `expect`, which is verified
//! when the mock server is dropped at the end of each test.

mod common;

use common::{MockKeycloak, primary_jwk};
use futures::future::join_all;
use scoutview_auth::KeySetError;
use scoutview_auth::jwt::KeySetCache;
use std::sync::Arc;
use std::time::Duration;

fn cache(keycloak: &MockKeycloak) -> KeySetCache {
    KeySetCache::new(&keycloak.settings(false)).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch() {
    let keycloak = MockKeycloak::start().await;
    keycloak
        .mock_discovery(Some(1), Duration::from_millis(200))
        .await;
    keycloak.mock_jwks(vec![primary_jwk()], Some(1)).await;
    let cache = cache(&keycloak);

    let callers = (0..16).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_keys().await })
    });
    let results = join_all(callers).await;

    let sets: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert!(sets.iter().all(|keys| Arc::ptr_eq(keys, &sets[0])));
    assert_eq!(sets[0].keys.len(), 1);
    assert_eq!(cache.fetch_count(), 1);
    assert!(cache.is_populated());
}

#[tokio::test]
async fn test_populated_cache_makes_no_further_requests() {
    let keycloak = MockKeycloak::start().await;
    keycloak.mock_discovery(Some(1), Duration::ZERO).await;
    keycloak.mock_jwks(vec![primary_jwk()], Some(1)).await;
    let cache = cache(&keycloak);

    let first = cache.get_keys().await.unwrap();
    for _ in 0..5 {
        let again = cache.get_keys().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(cache.fetch_count(), 1);
}

#[tokio::test]
async fn test_abandoned_waiter_does_not_cancel_fetch() {
    let keycloak = MockKeycloak::start().await;
    keycloak
        .mock_discovery(Some(1), Duration::from_millis(300))
        .await;
    keycloak.mock_jwks(vec![primary_jwk()], Some(1)).await;
    let cache = cache(&keycloak);

    // The only waiter gives up long before discovery answers
    let abandoned = tokio::time::timeout(Duration::from_millis(20), cache.get_keys()).await;
    assert!(abandoned.is_err());
    assert!(!cache.is_populated());

    // A later caller joins the same fetch instead of starting another
    let keys = cache.get_keys().await.unwrap();
    assert_eq!(keys.keys.len(), 1);
    assert_eq!(cache.fetch_count(), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_retried_by_next_call() {
    let keycloak = MockKeycloak::start().await;
    keycloak.mock_discovery_status(500, Some(2)).await;
    let cache = cache(&keycloak);

    let first = cache.get_keys().await.unwrap_err();
    assert!(matches!(first, KeySetError::DiscoveryStatus { status: 500, .. }));
    assert!(!cache.is_populated());

    let second = cache.get_keys().await.unwrap_err();
    assert_eq!(first, second);
    assert_eq!(cache.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_waiters_all_see_failure() {
    let keycloak = MockKeycloak::start().await;
    wiremock::Mock::given(wiremock::matchers::path(common::discovery_path()))
        .respond_with(wiremock::ResponseTemplate::new(502).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&keycloak.server)
        .await;
    let cache = cache(&keycloak);

    let callers = (0..8).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_keys().await })
    });
    for result in join_all(callers).await {
        let err = result.unwrap().unwrap_err();
        assert!(matches!(err, KeySetError::DiscoveryStatus { status: 502, .. }));
    }
    assert_eq!(cache.fetch_count(), 1);
}

#[tokio::test]
async fn test_missing_jwks_uri_reported() {
    let keycloak = MockKeycloak::start().await;
    keycloak
        .mock_discovery_body(serde_json::json!({"issuer": keycloak.issuer()}))
        .await;
    let cache = cache(&keycloak);

    let err = cache.get_keys().await.unwrap_err();
    assert!(matches!(err, KeySetError::MissingJwksUri { .. }));
}

#[tokio::test]
async fn test_malformed_key_set_reported() {
    let keycloak = MockKeycloak::start().await;
    keycloak.mock_discovery(Some(1), Duration::ZERO).await;
    wiremock::Mock::given(wiremock::matchers::path(common::jwks_path()))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&keycloak.server)
        .await;
    let cache = cache(&keycloak);

    let err = cache.get_keys().await.unwrap_err();
    assert!(matches!(err, KeySetError::KeySetMalformed { .. }));
}

#[tokio::test]
async fn test_key_set_status_reported() {
    let keycloak = MockKeycloak::start().await;
    keycloak.mock_discovery(Some(1), Duration::ZERO).await;
    wiremock::Mock::given(wiremock::matchers::path(common::jwks_path()))
        .respond_with(wiremock::ResponseTemplate::new(404))
        .expect(1)
        .mount(&keycloak.server)
        .await;
    let cache = cache(&keycloak);

    let err = cache.get_keys().await.unwrap_err();
    assert!(matches!(err, KeySetError::KeySetStatus { status: 404, .. }));
}
