//! Binding hooks that record every call for later assertions.

use common::types::ParticipantId;
use std::sync::{Arc, Mutex};
use track_binding::binding::{Attachment, BindingHooks, DetachReason};
use track_binding::identity::BindingTarget;

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    Bound(Attachment),
    Unbound {
        target: BindingTarget,
        reason: DetachReason,
    },
    GaveUp {
        target: BindingTarget,
        attempts: u32,
    },
}

/// Recording [`BindingHooks`]. Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    calls: Arc<Mutex<Vec<HookCall>>>,
}

impl RecordingHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<HookCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HookCall::Bound(_)))
            .count()
    }

    #[must_use]
    pub fn unbound_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HookCall::Unbound { .. }))
            .count()
    }

    /// Participant ids passed to `on_bound`, in order.
    #[must_use]
    pub fn bound_ids(&self) -> Vec<ParticipantId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HookCall::Bound(attachment) => Some(attachment.target.id().clone()),
                _ => None,
            })
            .collect()
    }

    /// Detach reasons passed to `on_unbound`, in order.
    #[must_use]
    pub fn unbound_reasons(&self) -> Vec<DetachReason> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HookCall::Unbound { reason, .. } => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl BindingHooks for RecordingHooks {
    fn on_bound(&mut self, attachment: &Attachment) {
        self.calls
            .lock()
            .unwrap()
            .push(HookCall::Bound(attachment.clone()));
    }

    fn on_unbound(&mut self, target: &BindingTarget, reason: DetachReason) {
        self.calls.lock().unwrap().push(HookCall::Unbound {
            target: target.clone(),
            reason,
        });
    }

    fn on_gave_up(&mut self, target: &BindingTarget, attempts: u32) {
        self.calls.lock().unwrap().push(HookCall::GaveUp {
            target: target.clone(),
            attempts,
        });
    }
}
