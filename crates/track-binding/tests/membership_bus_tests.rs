//! Membership bus integration tests.
//!
//! Several bindings share one bus, the way every surface in a room follows
//! the same conference.

use std::time::Duration;

use tb_test_utils::{connected_event, joined, left, spawn_binding, MockProbe, RecordingHooks};
use track_binding::binding::{BindingState, DetachReason};
use track_binding::errors::BindingError;
use track_binding::identity::BindingConfig;
use track_binding::membership::MembershipBus;

const FORWARD_DELAY: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn test_bus_fans_out_to_every_binding() -> Result<(), BindingError> {
    let bus = MembershipBus::new(32);
    let probe = MockProbe::new().with_ready("p1").with_ready("p2");
    let alice_hooks = RecordingHooks::new();
    let bob_hooks = RecordingHooks::new();

    let (alice, _alice_task) =
        spawn_binding(BindingConfig::by_display_name("alice"), &probe, &alice_hooks);
    let (bob, _bob_task) = spawn_binding(BindingConfig::by_display_name("bob"), &probe, &bob_hooks);
    let _alice_sub = bus.attach(alice.clone());
    let _bob_sub = bus.attach(bob.clone());
    assert_eq!(bus.subscriber_count(), 2);

    assert_eq!(bus.publish(connected_event()), 2);
    tokio::time::sleep(FORWARD_DELAY).await;

    assert_eq!(alice.current_binding().await?, Some("p1".into()));
    assert_eq!(bob.current_binding().await?, Some("p2".into()));

    // Only bob's binding reacts to bob leaving
    bus.publish(left("p2"));
    tokio::time::sleep(FORWARD_DELAY).await;

    assert_eq!(alice.status().await?.state, BindingState::Bound);
    assert_eq!(bob.status().await?.state, BindingState::Unbound);
    assert!(alice_hooks.unbound_reasons().is_empty());
    assert_eq!(bob_hooks.unbound_reasons(), vec![DetachReason::ParticipantLeft]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_late_subscriber_converges_on_current_roster() -> Result<(), BindingError> {
    let bus = MembershipBus::new(32);
    bus.publish(connected_event());
    bus.publish(left("p2"));
    bus.publish(joined("p9", "bob"));

    let probe = MockProbe::new().with_ready("p2").with_ready("p9");
    let hooks = RecordingHooks::new();
    let (bob, _task) = spawn_binding(BindingConfig::by_display_name("bob"), &probe, &hooks);
    let _sub = bus.attach(bob.clone());
    tokio::time::sleep(FORWARD_DELAY).await;

    // The replayed roster only knows the rejoined bob
    assert_eq!(bob.current_binding().await?, Some("p9".into()));
    assert_eq!(hooks.bound_ids(), vec!["p9".into()]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_lagged_subscriber_resyncs_from_snapshot() -> Result<(), BindingError> {
    // Tiny buffer so a burst overruns it before the forwarder runs
    let bus = MembershipBus::new(2);
    let probe = MockProbe::new().with_ready("p8");
    let hooks = RecordingHooks::new();
    let (bob, _task) = spawn_binding(BindingConfig::by_display_name("bob"), &probe, &hooks);
    let _sub = bus.attach(bob.clone());

    bus.publish(connected_event());
    for i in 0..5 {
        bus.publish(joined(&format!("p{}", 10 + i), "guest"));
    }
    bus.publish(left("p2"));
    bus.publish(joined("p8", "bob"));
    tokio::time::sleep(FORWARD_DELAY).await;

    assert_eq!(bob.current_binding().await?, Some("p8".into()));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disposed_binding_stops_following() -> Result<(), BindingError> {
    let bus = MembershipBus::new(32);
    let probe = MockProbe::new().with_ready("p2");
    let hooks = RecordingHooks::new();
    let (bob, _task) = spawn_binding(BindingConfig::by_display_name("bob"), &probe, &hooks);

    let sub = bus.attach(bob.clone());
    bus.publish(connected_event());
    tokio::time::sleep(FORWARD_DELAY).await;
    assert_eq!(bob.current_binding().await?, Some("p2".into()));

    drop(sub);
    tokio::time::sleep(FORWARD_DELAY).await;
    assert_eq!(bus.subscriber_count(), 0);

    bus.publish(left("p2"));
    tokio::time::sleep(FORWARD_DELAY).await;
    assert_eq!(bob.current_binding().await?, Some("p2".into()));
    assert_eq!(hooks.unbound_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_binding_ends_forwarding() -> Result<(), BindingError> {
    let bus = MembershipBus::new(32);
    let probe = MockProbe::new();
    let hooks = RecordingHooks::new();
    let (bob, task) = spawn_binding(BindingConfig::by_display_name("bob"), &probe, &hooks);

    let sub = bus.attach(bob.clone());
    bob.cancel();
    task.await
        .map_err(|e| BindingError::Internal(e.to_string()))?;
    tokio::time::sleep(FORWARD_DELAY).await;

    // The subscription token is a child of the actor's token
    assert!(!sub.is_active());
    assert_eq!(bus.subscriber_count(), 0);

    Ok(())
}
