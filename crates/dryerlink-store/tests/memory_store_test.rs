// Subscription behaviour of `MemoryStore` through the `KvStore` contract.

use serde_json::json;

use dryerlink_store::{ChangeEvent, Error, KvStore, MemoryStore, StorePath};

// ── Helpers ─────────────────────────────────────────────────────────

fn path(s: &str) -> StorePath {
    s.parse().expect("valid path")
}

fn value_of(event: Option<ChangeEvent>) -> Option<serde_json::Value> {
    match event {
        Some(ChangeEvent::Value(snap)) => snap.into_value(),
        other => panic!("expected a value delivery, got {other:?}"),
    }
}

// ── Delivery ────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_delivers_current_value_immediately() {
    let store = MemoryStore::new();
    store.put(&path("devices/dev-1/current"), json!({ "temperature": 41.5 }));

    let mut sub = store.subscribe(&path("devices/dev-1/current")).await.unwrap();

    assert_eq!(
        value_of(sub.try_next()),
        Some(json!({ "temperature": 41.5 }))
    );
    assert!(sub.try_next().is_none());
}

#[tokio::test]
async fn subscribe_to_empty_path_delivers_absent_snapshot() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe(&path("devices/none/current")).await.unwrap();
    assert_eq!(value_of(sub.try_next()), None);
}

#[tokio::test]
async fn writes_are_delivered_in_order() {
    let store = MemoryStore::new();
    let current = path("devices/dev-1/current");
    let mut sub = store.subscribe(&current).await.unwrap();
    let _ = sub.try_next();

    for t in 1..=3 {
        store.write(&current, json!({ "timestamp": t })).await.unwrap();
    }

    for t in 1..=3 {
        assert_eq!(value_of(sub.next().await), Some(json!({ "timestamp": t })));
    }
}

#[tokio::test]
async fn parent_and_child_writes_reach_overlapping_subscribers() {
    let store = MemoryStore::new();
    let info = path("devices/dev-1/deviceInfo");
    let mut sub = store.subscribe(&info).await.unwrap();
    let _ = sub.try_next();

    store
        .write(&path("devices/dev-1/deviceInfo/pairedTo"), json!("u1"))
        .await
        .unwrap();
    assert_eq!(value_of(sub.try_next()), Some(json!({ "pairedTo": "u1" })));

    store
        .write(&path("devices/dev-1"), json!({ "deviceInfo": { "pairedTo": "u2" } }))
        .await
        .unwrap();
    assert_eq!(value_of(sub.try_next()), Some(json!({ "pairedTo": "u2" })));
}

#[tokio::test]
async fn unrelated_and_identical_writes_are_not_delivered() {
    let store = MemoryStore::new();
    let current = path("devices/dev-1/current");
    store.put(&current, json!({ "timestamp": 1 }));
    let mut sub = store.subscribe(&current).await.unwrap();
    let _ = sub.try_next();

    store.write(&path("devices/dev-2/current"), json!({ "timestamp": 9 })).await.unwrap();
    store.write(&current, json!({ "timestamp": 1 })).await.unwrap();

    assert!(sub.try_next().is_none());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn unsubscribe_stops_deliveries_and_releases_registration() {
    let store = MemoryStore::new();
    let current = path("devices/dev-1/current");
    let mut sub = store.subscribe(&current).await.unwrap();
    let _ = sub.try_next();
    assert_eq!(store.subscriber_count(&current), 1);

    store.unsubscribe(sub.id()).await.unwrap();
    store.write(&current, json!({ "timestamp": 2 })).await.unwrap();

    assert_eq!(store.subscriber_count(&current), 0);
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn unsubscribe_twice_reports_unknown_subscription() {
    let store = MemoryStore::new();
    let sub = store.subscribe(&path("a")).await.unwrap();
    store.unsubscribe(sub.id()).await.unwrap();
    let err = store.unsubscribe(sub.id()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownSubscription { .. }));
}

#[tokio::test]
async fn revoke_delivers_terminal_cancellation() {
    let store = MemoryStore::new();
    let current = path("devices/dev-1/current");
    let mut sub = store.subscribe(&current).await.unwrap();
    let _ = sub.try_next();

    assert_eq!(store.revoke(&path("devices/dev-1"), "permission denied"), 1);

    match sub.next().await {
        Some(ChangeEvent::Cancelled(Error::Cancelled { reason, .. })) => {
            assert_eq!(reason, "permission denied");
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert!(sub.next().await.is_none());
    assert_eq!(store.total_subscribers(), 0);
}

#[tokio::test]
async fn subscribe_fails_while_offline() {
    let store = MemoryStore::new();
    store.set_available(false);
    let err = store.subscribe(&path("a")).await.unwrap_err();
    assert!(matches!(err, Error::Unavailable { .. }));
}
