//! `BindingMachine` - per-consumer binding state machine.
//!
//! The machine is synchronous and owns no timers. Every transition returns a
//! [`Next`] telling the driver whether a re-probe has to be scheduled; the
//! driver hands the [`RetryTicket`] back through [`BindingMachine::on_retry`]
//! once the delay has elapsed. Tickets from an older generation, or for an
//! attempt that has already been superseded, are discarded.
//!
//! # Generations
//!
//! The generation counter is bumped on every re-resolution and every detach.
//! Only the newest generation may bind.

use common::types::ParticipantId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::attachment::{Attachment, SurfaceKind};
use super::hooks::{BindingHooks, DetachReason};
use super::probe::TrackProbe;
use super::state::{BindingState, BindingStatus, Next, RetryPolicy, RetryTicket};
use crate::errors::Deferral;
use crate::identity::{BindingConfig, BindingTarget, ParticipantRecord, Roster, SelfIdentity};
use crate::membership::MembershipEvent;
use crate::observability::metrics;

/// Binding state machine for one consumer.
pub struct BindingMachine {
    consumer_id: String,
    surface: SurfaceKind,
    policy: RetryPolicy,
    config: BindingConfig,
    roster: Roster,
    state: BindingState,
    /// Target being probed (`Probing` only).
    pending: Option<BindingTarget>,
    /// Attached target (`Bound` only).
    resolved: Option<BindingTarget>,
    attempt: u32,
    generation: u64,
    gave_up: bool,
    probe: Arc<dyn TrackProbe>,
    hooks: Box<dyn BindingHooks>,
}

impl BindingMachine {
    /// Create a machine in `Unresolved` with an empty roster.
    pub fn new(
        consumer_id: impl Into<String>,
        surface: SurfaceKind,
        config: BindingConfig,
        policy: RetryPolicy,
        probe: Arc<dyn TrackProbe>,
        hooks: Box<dyn BindingHooks>,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            surface,
            policy,
            config,
            roster: Roster::default(),
            state: BindingState::Unresolved,
            pending: None,
            resolved: None,
            attempt: 0,
            generation: 0,
            gave_up: false,
            probe,
            hooks,
        }
    }

    #[must_use]
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Participant id currently bound, if any.
    #[must_use]
    pub fn current_binding(&self) -> Option<&ParticipantId> {
        self.resolved.as_ref().map(BindingTarget::id)
    }

    /// Snapshot for status queries.
    #[must_use]
    pub fn status(&self) -> BindingStatus {
        BindingStatus {
            consumer_id: self.consumer_id.clone(),
            state: self.state,
            resolved: self.resolved.clone(),
            pending: self.pending.clone(),
            attempt: self.attempt,
            generation: self.generation,
            config: self.config.clone(),
        }
    }

    /// Apply a membership event.
    pub fn on_membership(&mut self, event: MembershipEvent) -> Next {
        match event {
            MembershipEvent::Connected {
                self_identity,
                participants,
            } => self.on_connected(self_identity, participants),
            MembershipEvent::ParticipantJoined { participant } => {
                self.on_participant_joined(participant)
            }
            MembershipEvent::ParticipantLeft { participant_id } => {
                self.on_participant_left(&participant_id)
            }
        }
    }

    /// Conference (re)connected: replace the roster.
    pub fn on_connected(
        &mut self,
        self_identity: SelfIdentity,
        participants: Vec<ParticipantRecord>,
    ) -> Next {
        debug!(
            target: "tb.binding.machine",
            consumer_id = %self.consumer_id,
            self_id = %self_identity.id,
            participants = participants.len(),
            "Connected"
        );
        self.roster.reset(self_identity, participants);
        self.membership_changed()
    }

    pub fn on_participant_joined(&mut self, participant: ParticipantRecord) -> Next {
        self.roster.upsert(participant);
        self.membership_changed()
    }

    /// A participant left. Detaches synchronously when it is the bound one;
    /// abandons the probe when it is the one being probed.
    pub fn on_participant_left(&mut self, participant_id: &ParticipantId) -> Next {
        self.roster.remove(participant_id);

        if self.current_binding() == Some(participant_id) {
            self.release(DetachReason::ParticipantLeft);
            self.state = BindingState::Unbound;
            return Next::Idle;
        }

        if self.state == BindingState::Probing
            && self.pending.as_ref().map(BindingTarget::id) == Some(participant_id)
        {
            // Nothing was attached, so no detach hook
            debug!(
                target: "tb.binding.machine",
                consumer_id = %self.consumer_id,
                participant_id = %participant_id,
                attempts = self.attempt,
                "Probed participant left"
            );
            self.pending = None;
            self.generation += 1;
            self.attempt = 0;
            self.gave_up = false;
            self.state = BindingState::Unbound;
            return Next::Idle;
        }

        self.membership_changed()
    }

    /// Replace the config. An unchanged config is a no-op.
    pub fn set_config(&mut self, config: BindingConfig) -> Next {
        if config == self.config {
            return Next::Idle;
        }

        info!(
            target: "tb.binding.machine",
            consumer_id = %self.consumer_id,
            from_state = self.state.as_str(),
            "Binding config changed"
        );

        self.config = config;
        if self.state == BindingState::Bound {
            self.release(DetachReason::ConfigChanged);
        }
        self.state = BindingState::Unresolved;
        self.evaluate()
    }

    /// Explicit re-evaluation request.
    ///
    /// A bound binding stays bound unless its config now resolves elsewhere.
    /// Any other state starts a fresh generation, which also restarts a
    /// binding that gave up.
    pub fn reevaluate(&mut self) -> Next {
        match self.state {
            BindingState::Bound => self.membership_changed(),
            _ => self.evaluate(),
        }
    }

    /// Deliver a retry ticket whose delay has elapsed.
    pub fn on_retry(&mut self, ticket: RetryTicket) -> Next {
        if self.state != BindingState::Probing
            || ticket.generation != self.generation
            || ticket.attempt != self.attempt
        {
            debug!(
                target: "tb.binding.machine",
                consumer_id = %self.consumer_id,
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                state = self.state.as_str(),
                "Discarding stale retry"
            );
            metrics::record_deferral(Deferral::StaleCallback);
            return Next::Idle;
        }

        self.probe_pending()
    }

    /// Tear the binding down: detach if bound and invalidate pending retries.
    pub fn shutdown(&mut self) {
        if self.state == BindingState::Bound {
            self.release(DetachReason::Teardown);
        } else {
            self.generation += 1;
        }
        self.pending = None;
        self.state = BindingState::Unresolved;
    }

    fn membership_changed(&mut self) -> Next {
        match self.state {
            BindingState::Unresolved | BindingState::Unbound => self.evaluate(),
            BindingState::Probing => {
                let target = self.roster.resolve(&self.config);
                if !self.gave_up && target.is_some() && target == self.pending {
                    // Same target, keep the retry already in flight
                    Next::Idle
                } else {
                    self.evaluate()
                }
            }
            BindingState::Bound => {
                let target = self.roster.resolve(&self.config);
                if target == self.resolved {
                    Next::Idle
                } else {
                    self.release(DetachReason::Superseded);
                    self.state = BindingState::Unresolved;
                    self.evaluate()
                }
            }
        }
    }

    /// Re-run resolution in a fresh generation.
    fn evaluate(&mut self) -> Next {
        self.generation += 1;
        self.attempt = 0;
        self.gave_up = false;
        self.pending = None;

        match self.roster.resolve(&self.config) {
            None => {
                self.state = BindingState::Unresolved;
                debug!(
                    target: "tb.binding.machine",
                    consumer_id = %self.consumer_id,
                    generation = self.generation,
                    "No participant matches binding config"
                );
                metrics::record_deferral(Deferral::NoIdentity);
                Next::Idle
            }
            Some(target) => {
                debug!(
                    target: "tb.binding.machine",
                    consumer_id = %self.consumer_id,
                    participant_id = %target.id(),
                    kind = target.kind(),
                    generation = self.generation,
                    "Binding target resolved, probing"
                );
                self.state = BindingState::Probing;
                self.pending = Some(target);
                self.probe_pending()
            }
        }
    }

    fn probe_pending(&mut self) -> Next {
        let Some(target) = self.pending.clone() else {
            return Next::Idle;
        };

        let readiness = self.probe.readiness(&target);
        if readiness.is_ready() {
            self.attach(target);
            return Next::Idle;
        }

        self.attempt += 1;
        metrics::record_deferral(Deferral::ResourceNotReady);
        metrics::record_probe_not_ready(readiness);

        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                warn!(
                    target: "tb.binding.machine",
                    consumer_id = %self.consumer_id,
                    participant_id = %target.id(),
                    attempts = self.attempt,
                    readiness = readiness.as_str(),
                    "Track never became ready, giving up"
                );
                self.gave_up = true;
                metrics::record_retry_gave_up();
                self.hooks.on_gave_up(&target, self.attempt);
                return Next::GaveUp;
            }
        }

        debug!(
            target: "tb.binding.machine",
            consumer_id = %self.consumer_id,
            participant_id = %target.id(),
            attempt = self.attempt,
            readiness = readiness.as_str(),
            "Track not ready, retry scheduled"
        );

        Next::RetryAfter(RetryTicket {
            generation: self.generation,
            attempt: self.attempt,
            delay: self.policy.delay,
        })
    }

    fn attach(&mut self, target: BindingTarget) {
        let attachment = Attachment::new(target.clone(), self.surface);

        self.state = BindingState::Bound;
        self.pending = None;
        self.resolved = Some(target);

        info!(
            target: "tb.binding.machine",
            consumer_id = %self.consumer_id,
            participant_id = %attachment.target.id(),
            kind = attachment.target.kind(),
            media_element = %attachment.media_element,
            attempts = self.attempt,
            "Track bound"
        );
        metrics::record_attach(&attachment.target);
        self.hooks.on_bound(&attachment);
    }

    /// Leave `Bound`: clear the target, call the detach hook, bump the generation.
    fn release(&mut self, reason: DetachReason) {
        self.generation += 1;
        if let Some(target) = self.resolved.take() {
            info!(
                target: "tb.binding.machine",
                consumer_id = %self.consumer_id,
                participant_id = %target.id(),
                reason = reason.as_str(),
                "Track unbound"
            );
            metrics::record_detach(reason);
            self.hooks.on_unbound(&target, reason);
        }
    }
}
