//! Binding states, retry policy and status snapshots.

use common::types::ParticipantId;
use serde::Serialize;
use std::time::Duration;

use crate::config::DEFAULT_RETRY_DELAY_MS;
use crate::identity::{BindingConfig, BindingTarget};

/// Lifecycle state of one binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    /// No participant matches the config (initial).
    #[default]
    Unresolved,
    /// Target known, waiting for its track to become ready.
    Probing,
    /// Resource attached to the consumer.
    Bound,
    /// Bound participant left; resource detached.
    Unbound,
}

impl BindingState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BindingState::Unresolved => "unresolved",
            BindingState::Probing => "probing",
            BindingState::Bound => "bound",
            BindingState::Unbound => "unbound",
        }
    }
}

/// How often and how long to re-probe a target that is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each re-probe.
    pub delay: Duration,
    /// Not-ready probes tolerated per resolution. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_attempts: None,
        }
    }
}

/// A scheduled re-probe.
///
/// Captures the generation and attempt it was issued for so that a ticket
/// outliving its binding can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTicket {
    pub generation: u64,
    pub attempt: u32,
    pub delay: Duration,
}

/// What the driver of a machine has to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Next {
    /// Nothing to schedule.
    Idle,
    /// Deliver this ticket back to the machine after `ticket.delay`.
    RetryAfter(RetryTicket),
    /// Attempt cap reached; nothing scheduled until the next trigger.
    GaveUp,
}

/// Read-only snapshot of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingStatus {
    pub consumer_id: String,
    pub state: BindingState,
    /// Bound target; `Some` only in [`BindingState::Bound`].
    pub resolved: Option<BindingTarget>,
    /// Target being probed; `Some` only in [`BindingState::Probing`].
    pub pending: Option<BindingTarget>,
    pub attempt: u32,
    pub generation: u64,
    #[serde(skip)]
    pub config: BindingConfig,
}

impl BindingStatus {
    /// Participant id of the bound target, if any.
    #[must_use]
    pub fn resolved_id(&self) -> Option<&ParticipantId> {
        self.resolved.as_ref().map(BindingTarget::id)
    }
}
