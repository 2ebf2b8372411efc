//! Attach/detach side effects.
//!
//! Hooks run on the binding's own task, synchronously with the transition
//! that triggers them. They must be fast and must not block.

use serde::Serialize;

use super::attachment::Attachment;
use crate::identity::BindingTarget;

/// Why a bound resource was detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachReason {
    /// The bound participant left the conference.
    ParticipantLeft,
    /// The consumer's config changed.
    ConfigChanged,
    /// Membership changed and the config now resolves elsewhere.
    Superseded,
    /// The consumer is being torn down.
    Teardown,
}

impl DetachReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DetachReason::ParticipantLeft => "participant_left",
            DetachReason::ConfigChanged => "config_changed",
            DetachReason::Superseded => "superseded",
            DetachReason::Teardown => "teardown",
        }
    }
}

/// Consumer side effects driven by a binding.
pub trait BindingHooks: Send {
    /// Called exactly once per entry into `Bound`.
    fn on_bound(&mut self, attachment: &Attachment);

    /// Called exactly once per exit from `Bound`.
    fn on_unbound(&mut self, target: &BindingTarget, reason: DetachReason);

    /// Called when the retry cap is reached for `target`.
    fn on_gave_up(&mut self, _target: &BindingTarget, _attempts: u32) {}
}

type BoundFn = Box<dyn FnMut(&Attachment) + Send>;
type UnboundFn = Box<dyn FnMut(&BindingTarget, DetachReason) + Send>;
type GaveUpFn = Box<dyn FnMut(&BindingTarget, u32) + Send>;

/// Closure-backed [`BindingHooks`].
///
/// ```rust,ignore
/// let hooks = CallbackHooks::new()
///     .with_bound(|a| surface.set_source(&a.media_element))
///     .with_unbound(|_, _| surface.clear_source());
/// ```
#[derive(Default)]
pub struct CallbackHooks {
    bound: Option<BoundFn>,
    unbound: Option<UnboundFn>,
    gave_up: Option<GaveUpFn>,
}

impl CallbackHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bound(mut self, f: impl FnMut(&Attachment) + Send + 'static) -> Self {
        self.bound = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_unbound(
        mut self,
        f: impl FnMut(&BindingTarget, DetachReason) + Send + 'static,
    ) -> Self {
        self.unbound = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_gave_up(mut self, f: impl FnMut(&BindingTarget, u32) + Send + 'static) -> Self {
        self.gave_up = Some(Box::new(f));
        self
    }
}

impl BindingHooks for CallbackHooks {
    fn on_bound(&mut self, attachment: &Attachment) {
        if let Some(f) = self.bound.as_mut() {
            f(attachment);
        }
    }

    fn on_unbound(&mut self, target: &BindingTarget, reason: DetachReason) {
        if let Some(f) = self.unbound.as_mut() {
            f(target, reason);
        }
    }

    fn on_gave_up(&mut self, target: &BindingTarget, attempts: u32) {
        if let Some(f) = self.gave_up.as_mut() {
            f(target, attempts);
        }
    }
}
