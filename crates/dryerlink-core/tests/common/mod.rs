// Shared fixtures for the engine integration suites.
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use dryerlink_core::{Controller, DeviceId, EngineConfig, ManualClock, StaticIdentity, UserId};
use dryerlink_store::{KvStore, MemoryStore, StorePath};

pub const NOW: i64 = 1_700_000_000_000;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub identity: Arc<StaticIdentity>,
    pub controller: Controller,
}

pub fn harness() -> Harness {
    harness_with(MemoryStore::new())
}

pub fn harness_with(store: MemoryStore) -> Harness {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::new(NOW));
    let identity = Arc::new(StaticIdentity::signed_in(user("userA")));
    let controller = Controller::with_clock(
        EngineConfig::default(),
        Arc::clone(&store) as Arc<dyn KvStore>,
        Arc::clone(&identity) as _,
        Arc::clone(&clock) as _,
    );
    Harness {
        store,
        clock,
        identity,
        controller,
    }
}

pub fn path(s: &str) -> StorePath {
    s.parse().expect("valid path")
}

pub fn device(s: &str) -> DeviceId {
    DeviceId::new(s).expect("valid device id")
}

pub fn user(s: &str) -> UserId {
    UserId::new(s).expect("valid user id")
}

/// Seed `devicePairing/{code}` the way provisioning does.
pub fn provision_code(store: &MemoryStore, code: &str, device_id: &str, used: bool, expires_at: i64) {
    store.put(
        &path(&format!("devicePairing/{code}")),
        json!({ "deviceId": device_id, "used": used, "expiresAt": expires_at }),
    );
}

pub fn reading(temperature: f32, timestamp: i64) -> Value {
    json!({
        "temperature": temperature,
        "humidity": 40.0,
        "setpoint": 45.0,
        "ssrStatus": true,
        "dryingActive": true,
        "online": true,
        "timestamp": timestamp
    })
}

/// Fail the test instead of hanging.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

/// Poll `check` until it holds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    within(async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}
