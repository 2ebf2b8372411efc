//! Track binding error types.
//!
//! The binding core never fails outward: a missing identity, a track that is
//! not ready yet and a timer that fires for a superseded binding are all
//! normal outcomes. They are described by [`Deferral`] for logging and
//! metrics. [`BindingError`] only covers the edges (actor mailboxes, config,
//! replay scripts).

use thiserror::Error;

/// Errors surfaced at the edges of the binding core.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Actor mailbox closed or response channel dropped.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Replay script could not be read or parsed.
    #[error("Script error: {0}")]
    Script(String),
}

impl From<crate::config::ConfigError> for BindingError {
    fn from(err: crate::config::ConfigError) -> Self {
        BindingError::Config(err.to_string())
    }
}

/// Why a binding did not reach `Bound` on this evaluation.
///
/// None of these are failures. They are retried silently or dropped once
/// superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// Config resolves to no participant.
    NoIdentity,
    /// Track or attach target is absent or still loading.
    ResourceNotReady,
    /// A retry fired for a binding generation that no longer applies.
    StaleCallback,
}

impl Deferral {
    /// Returns the deferral as a string for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Deferral::NoIdentity => "no_identity",
            Deferral::ResourceNotReady => "resource_not_ready",
            Deferral::StaleCallback => "stale_callback",
        }
    }
}
