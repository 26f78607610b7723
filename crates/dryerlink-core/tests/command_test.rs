// Command slot writes and acknowledgment tracking.

mod common;

use std::time::Duration;

use serde_json::json;

use dryerlink_core::{AckOutcome, CommandAction, CoreError};

use common::{NOW, device, eventually, harness, path, within};

#[tokio::test]
async fn command_is_written_unacknowledged() {
    let h = harness();
    let dev = device("dev-1");

    let cmd = h
        .controller
        .send_command(&dev, CommandAction::SetTemp, 45.0)
        .await
        .unwrap();

    assert_eq!(cmd.timestamp, NOW);
    assert_eq!(
        h.store.get(&path("devices/dev-1/commands")),
        Some(json!({
            "action": "SET_TEMP",
            "value": 45.0,
            "timestamp": NOW,
            "acknowledged": false
        }))
    );
}

#[tokio::test]
async fn newer_command_replaces_unacknowledged_one() {
    let h = harness();
    let dev = device("dev-1");

    h.controller
        .send_command(&dev, CommandAction::Start, 0.0)
        .await
        .unwrap();
    h.clock.advance(1_000);
    let b = h
        .controller
        .send_command(&dev, CommandAction::Stop, 0.0)
        .await
        .unwrap();

    let slot = h.controller.current_command(&dev).await.unwrap().unwrap();
    assert_eq!(slot, b);
    assert_eq!(slot.action, CommandAction::Stop);
}

#[tokio::test]
async fn out_of_range_setpoint_writes_nothing() {
    let h = harness();
    let dev = device("dev-1");

    let err = h
        .controller
        .send_command(&dev, CommandAction::SetTemp, 75.0)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(h.store.get(&path("devices/dev-1/commands")).is_none());
}

#[tokio::test]
async fn firmware_acknowledgment_resolves_wait() {
    let h = harness();
    let dev = device("dev-1");
    let cmd = h
        .controller
        .send_command(&dev, CommandAction::Start, 0.0)
        .await
        .unwrap();

    let waiter = {
        let controller = h.controller.clone();
        let dev = dev.clone();
        let cmd = cmd.clone();
        tokio::spawn(async move { controller.await_acknowledgment(&dev, &cmd).await })
    };
    eventually(|| h.store.subscriber_count(&path("devices/dev-1/commands")) == 1).await;

    // Firmware flips the flag in place.
    h.store
        .put(&path("devices/dev-1/commands/acknowledged"), json!(true));

    let outcome = within(waiter).await.unwrap().unwrap();
    let AckOutcome::Acknowledged(acked) = outcome else {
        panic!("expected acknowledgment, got {outcome:?}");
    };
    assert!(acked.acknowledged);
    assert!(cmd.same_issuance(&acked));
    assert_eq!(h.store.total_subscribers(), 0);
}

#[tokio::test]
async fn already_acknowledged_command_resolves_immediately() {
    let h = harness();
    let dev = device("dev-1");
    let cmd = h
        .controller
        .send_command(&dev, CommandAction::Stop, 0.0)
        .await
        .unwrap();
    h.store
        .put(&path("devices/dev-1/commands/acknowledged"), json!(true));

    let outcome = within(h.controller.await_acknowledgment(&dev, &cmd))
        .await
        .unwrap();
    assert!(matches!(outcome, AckOutcome::Acknowledged(_)));
}

#[tokio::test]
async fn replaced_command_reports_superseded() {
    let h = harness();
    let dev = device("dev-1");
    let a = h
        .controller
        .send_command(&dev, CommandAction::Start, 0.0)
        .await
        .unwrap();

    let waiter = {
        let controller = h.controller.clone();
        let dev = dev.clone();
        let a = a.clone();
        tokio::spawn(async move { controller.await_acknowledgment(&dev, &a).await })
    };
    eventually(|| h.store.subscriber_count(&path("devices/dev-1/commands")) == 1).await;

    h.clock.advance(1_000);
    let b = h
        .controller
        .send_command(&dev, CommandAction::SetTemp, 50.0)
        .await
        .unwrap();

    let outcome = within(waiter).await.unwrap().unwrap();
    assert_eq!(outcome, AckOutcome::Superseded { by: Some(b) });
}

#[tokio::test]
async fn abandoned_wait_releases_its_subscription() {
    let h = harness();
    let dev = device("dev-1");
    let cmd = h
        .controller
        .send_command(&dev, CommandAction::Start, 0.0)
        .await
        .unwrap();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        h.controller.await_acknowledgment(&dev, &cmd),
    )
    .await;

    assert!(timed_out.is_err());
    eventually(|| h.store.total_subscribers() == 0).await;
}
