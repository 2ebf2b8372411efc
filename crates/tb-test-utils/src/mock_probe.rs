//! Scriptable track probe.
//!
//! # Example
//!
//! ```rust,ignore
//! use tb_test_utils::MockProbe;
//!
//! let probe = MockProbe::new()
//!     .with_ready("p1")
//!     .with_readiness("p2", TrackReadiness::Loading);
//!
//! // Later in the test: bob's video finishes loading
//! probe.set_ready("p2");
//! assert_eq!(probe.probes_for("p2"), 1);
//! ```

use common::types::ParticipantId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use track_binding::binding::{TrackProbe, TrackReadiness};
use track_binding::identity::BindingTarget;

/// Mock probe. Clones share state, so a test can keep one clone and hand
/// another to the machine.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    inner: Arc<Mutex<MockProbeInner>>,
}

#[derive(Debug, Default)]
struct MockProbeInner {
    /// Readiness per participant; absent means no track.
    tracks: HashMap<ParticipantId, TrackReadiness>,
    /// Probe calls per participant.
    probes: HashMap<ParticipantId, u32>,
}

impl MockProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `id` as ready from the start.
    #[must_use]
    pub fn with_ready(self, id: &str) -> Self {
        self.set_ready(id);
        self
    }

    #[must_use]
    pub fn with_readiness(self, id: &str, readiness: TrackReadiness) -> Self {
        self.set(id, readiness);
        self
    }

    pub fn set(&self, id: &str, readiness: TrackReadiness) {
        self.inner.lock().unwrap().tracks.insert(id.into(), readiness);
    }

    pub fn set_ready(&self, id: &str) {
        self.set(id, TrackReadiness::Ready);
    }

    /// Number of times `id` was probed.
    #[must_use]
    pub fn probes_for(&self, id: &str) -> u32 {
        let id = ParticipantId::from(id);
        self.inner
            .lock()
            .unwrap()
            .probes
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Total probe calls.
    #[must_use]
    pub fn probe_count(&self) -> u32 {
        self.inner.lock().unwrap().probes.values().sum()
    }
}

impl TrackProbe for MockProbe {
    fn readiness(&self, target: &BindingTarget) -> TrackReadiness {
        let mut inner = self.inner.lock().unwrap();
        *inner.probes.entry(target.id().clone()).or_insert(0) += 1;
        inner.tracks.get(target.id()).copied().unwrap_or_default()
    }
}
