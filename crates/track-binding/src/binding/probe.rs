//! Track readiness probe.

use serde::{Deserialize, Serialize};

use crate::identity::BindingTarget;

/// Result of probing a target's media track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackReadiness {
    /// Track decodable and media element loaded.
    Ready,
    /// Conference has no track for this participant yet.
    #[default]
    NoTrack,
    /// Track exists but its media element has not been created.
    NoElement,
    /// Media element exists but has not buffered enough to play.
    Loading,
}

impl TrackReadiness {
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == TrackReadiness::Ready
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrackReadiness::Ready => "ready",
            TrackReadiness::NoTrack => "no_track",
            TrackReadiness::NoElement => "no_element",
            TrackReadiness::Loading => "loading",
        }
    }
}

/// Reports whether a target's track can be attached right now.
///
/// Called on the binding's task; implementations must not block.
pub trait TrackProbe: Send + Sync {
    fn readiness(&self, target: &BindingTarget) -> TrackReadiness;
}

impl<F> TrackProbe for F
where
    F: Fn(&BindingTarget) -> TrackReadiness + Send + Sync,
{
    fn readiness(&self, target: &BindingTarget) -> TrackReadiness {
        self(target)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_probe() {
        let probe = |target: &BindingTarget| {
            if target.is_local() {
                TrackReadiness::Ready
            } else {
                TrackReadiness::Loading
            }
        };

        assert!(probe.readiness(&BindingTarget::Local("p0".into())).is_ready());
        assert_eq!(
            probe.readiness(&BindingTarget::Remote("p1".into())),
            TrackReadiness::Loading
        );
    }

    #[test]
    fn test_only_ready_is_ready() {
        assert!(TrackReadiness::Ready.is_ready());
        assert!(!TrackReadiness::NoTrack.is_ready());
        assert!(!TrackReadiness::NoElement.is_ready());
        assert!(!TrackReadiness::Loading.is_ready());
    }
}
