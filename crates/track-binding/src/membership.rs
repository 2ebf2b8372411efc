//! Conference membership events and the bus that fans them out to bindings.
//!
//! One [`MembershipBus`] exists per conference session. Every binding actor
//! attached to it receives membership events in publish order. A subscriber
//! attached after the conference connected, or one that fell behind the
//! broadcast buffer, first receives a synthesized `Connected` snapshot so its
//! roster converges on the bus's view.

use common::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::binding::BindingActorHandle;
use crate::identity::{ParticipantRecord, Roster, SelfIdentity};

/// Conference membership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// Conference (re)connected; carries the full roster.
    Connected {
        self_identity: SelfIdentity,
        participants: Vec<ParticipantRecord>,
    },
    /// A remote participant joined (or changed display name).
    ParticipantJoined { participant: ParticipantRecord },
    /// A remote participant left.
    ParticipantLeft { participant_id: ParticipantId },
}

impl MembershipEvent {
    /// Event name for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MembershipEvent::Connected { .. } => "connected",
            MembershipEvent::ParticipantJoined { .. } => "participant_joined",
            MembershipEvent::ParticipantLeft { .. } => "participant_left",
        }
    }
}

/// Fan-out of membership events to binding actors.
#[derive(Clone, Debug)]
pub struct MembershipBus {
    sender: broadcast::Sender<MembershipEvent>,
    /// Roster as of the last published event; `None` until connected.
    /// Held while publishing so that attach sees a consistent cut.
    roster: Arc<Mutex<Option<Roster>>>,
}

impl MembershipBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            roster: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish an event to every attached binding.
    ///
    /// Returns the number of subscribers it was delivered to.
    pub fn publish(&self, event: MembershipEvent) -> usize {
        let mut roster = self.roster.lock().unwrap_or_else(PoisonError::into_inner);

        match &event {
            MembershipEvent::Connected {
                self_identity,
                participants,
            } => {
                *roster = Some(Roster::new(
                    Some(self_identity.clone()),
                    participants.clone(),
                ));
            }
            MembershipEvent::ParticipantJoined { participant } => {
                if let Some(roster) = roster.as_mut() {
                    roster.upsert(participant.clone());
                }
            }
            MembershipEvent::ParticipantLeft { participant_id } => {
                if let Some(roster) = roster.as_mut() {
                    roster.remove(participant_id);
                }
            }
        }

        debug!(
            target: "tb.membership",
            event = event.as_str(),
            subscribers = self.sender.receiver_count(),
            "Publishing membership event"
        );

        // No subscribers is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Current roster as a `Connected` event, if the conference connected.
    #[must_use]
    pub fn snapshot(&self) -> Option<MembershipEvent> {
        let roster = self.roster.lock().unwrap_or_else(PoisonError::into_inner);
        roster.as_ref().and_then(connected_event)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Forward membership events to `handle` until the returned
    /// [`Subscription`] is disposed or the binding actor stops.
    #[must_use = "dropping the subscription detaches the binding immediately"]
    pub fn attach(&self, handle: BindingActorHandle) -> Subscription {
        let (receiver, initial) = {
            let roster = self.roster.lock().unwrap_or_else(PoisonError::into_inner);
            (
                self.sender.subscribe(),
                roster.as_ref().and_then(connected_event),
            )
        };

        let token = handle.child_token();
        let bus = self.clone();
        tokio::spawn(forward(bus, receiver, initial, handle, token.clone()));

        Subscription { token }
    }
}

fn connected_event(roster: &Roster) -> Option<MembershipEvent> {
    roster
        .self_identity()
        .map(|self_identity| MembershipEvent::Connected {
            self_identity: self_identity.clone(),
            participants: roster.participants().to_vec(),
        })
}

async fn forward(
    bus: MembershipBus,
    mut receiver: broadcast::Receiver<MembershipEvent>,
    initial: Option<MembershipEvent>,
    handle: BindingActorHandle,
    token: CancellationToken,
) {
    if let Some(event) = initial {
        debug!(
            target: "tb.membership",
            consumer_id = %handle.consumer_id(),
            "Replaying roster to late subscriber"
        );
        if handle.notify(event).await.is_err() {
            return;
        }
    }

    loop {
        let event = tokio::select! {
            biased;

            () = token.cancelled() => break,

            received = receiver.recv() => match received {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        target: "tb.membership",
                        consumer_id = %handle.consumer_id(),
                        skipped = skipped,
                        "Subscriber lagged, resyncing from roster snapshot"
                    );
                    match bus.snapshot() {
                        Some(snapshot) => snapshot,
                        None => continue,
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if token.is_cancelled() || handle.notify(event).await.is_err() {
            break;
        }
    }

    debug!(
        target: "tb.membership",
        consumer_id = %handle.consumer_id(),
        "Membership forwarding stopped"
    );
}

/// Disposer for a bus attachment. Dropping it also disposes.
#[derive(Debug)]
#[must_use = "dropping a Subscription stops forwarding"]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    /// Stop forwarding. Idempotent.
    pub fn dispose(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::binding::{
        BindingActor, BindingMachine, BindingState, CallbackHooks, RetryPolicy, SurfaceKind,
        TrackProbe, TrackReadiness,
    };
    use crate::identity::{BindingConfig, BindingTarget};
    use std::time::Duration;

    fn connected() -> MembershipEvent {
        MembershipEvent::Connected {
            self_identity: ParticipantRecord::new("p0", "carol"),
            participants: vec![
                ParticipantRecord::new("p1", "alice"),
                ParticipantRecord::new("p2", "bob"),
            ],
        }
    }

    fn spawn_bob_binding() -> BindingActorHandle {
        let probe = |_: &BindingTarget| TrackReadiness::Ready;
        let machine = BindingMachine::new(
            "bob-panel",
            SurfaceKind::Flat,
            BindingConfig::by_display_name("bob"),
            RetryPolicy::default(),
            Arc::new(probe) as Arc<dyn TrackProbe>,
            Box::new(CallbackHooks::new()),
        );
        let (handle, _task) = BindingActor::spawn(machine, 16, CancellationToken::new());
        handle
    }

    #[test]
    fn test_event_wire_format() {
        let event: MembershipEvent =
            serde_json::from_str(r#"{"event":"participant_left","participant_id":"p2"}"#).unwrap();
        assert_eq!(
            event,
            MembershipEvent::ParticipantLeft {
                participant_id: "p2".into()
            }
        );
        assert_eq!(event.as_str(), "participant_left");
    }

    #[test]
    fn test_snapshot_tracks_published_events() {
        let bus = MembershipBus::new(8);
        assert_eq!(bus.snapshot(), None);

        // Joins before connect are not folded into the snapshot
        bus.publish(MembershipEvent::ParticipantJoined {
            participant: ParticipantRecord::new("p9", "zed"),
        });
        assert_eq!(bus.snapshot(), None);

        bus.publish(connected());
        bus.publish(MembershipEvent::ParticipantLeft {
            participant_id: "p1".into(),
        });
        bus.publish(MembershipEvent::ParticipantJoined {
            participant: ParticipantRecord::new("p3", "dave"),
        });

        assert_eq!(
            bus.snapshot(),
            Some(MembershipEvent::Connected {
                self_identity: ParticipantRecord::new("p0", "carol"),
                participants: vec![
                    ParticipantRecord::new("p2", "bob"),
                    ParticipantRecord::new("p3", "dave"),
                ],
            })
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = MembershipBus::new(8);
        assert_eq!(bus.publish(connected()), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attached_binding_follows_bus() {
        let bus = MembershipBus::new(8);
        let handle = spawn_bob_binding();
        let subscription = bus.attach(handle.clone());
        assert!(subscription.is_active());

        bus.publish(connected());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.current_binding().await.unwrap(), Some("p2".into()));

        bus.publish(MembershipEvent::ParticipantLeft {
            participant_id: "p2".into(),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.status().await.unwrap().state, BindingState::Unbound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_subscriber_gets_roster_replay() {
        let bus = MembershipBus::new(8);
        bus.publish(connected());

        let handle = spawn_bob_binding();
        let _subscription = bus.attach(handle.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(handle.current_binding().await.unwrap(), Some("p2".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_subscription_stops_delivery() {
        let bus = MembershipBus::new(8);
        let handle = spawn_bob_binding();
        let subscription = bus.attach(handle.clone());

        bus.publish(connected());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.current_binding().await.unwrap(), Some("p2".into()));

        subscription.dispose();
        subscription.dispose();
        assert!(!subscription.is_active());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.subscriber_count(), 0);

        bus.publish(MembershipEvent::ParticipantLeft {
            participant_id: "p2".into(),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.current_binding().await.unwrap(), Some("p2".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_subscription_disposes() {
        let bus = MembershipBus::new(8);
        let handle = spawn_bob_binding();
        drop(bus.attach(handle));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_subscription_keeps_forwarding() {
        let bus = MembershipBus::new(8);
        let discarded = spawn_bob_binding();
        let held = spawn_bob_binding();

        let _ = bus.attach(discarded.clone());
        let subscription = bus.attach(held.clone());

        bus.publish(connected());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(subscription.is_active());
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(held.current_binding().await.unwrap(), Some("p2".into()));
        assert_eq!(discarded.current_binding().await.unwrap(), None);
        assert_eq!(
            discarded.status().await.unwrap().state,
            BindingState::Unresolved
        );
    }
}
