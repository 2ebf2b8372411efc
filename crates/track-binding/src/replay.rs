//! Scenario replay.
//!
//! Drives a single [`BindingActor`] through a scripted sequence of
//! membership changes, config changes and track readiness updates, and
//! records every attach/detach it produces. Used by the `track-binding`
//! binary and by integration tests.
//!
//! ```json
//! {
//!   "consumer": "bob-panel",
//!   "config": { "display_name": "bob" },
//!   "steps": [
//!     { "step": "connected",
//!       "self_identity": { "id": "p0", "display_name": "carol" },
//!       "participants": [{ "id": "p2", "display_name": "bob" }] },
//!     { "step": "wait_ms", "ms": 1200 },
//!     { "step": "track", "participant_id": "p2", "readiness": "ready" },
//!     { "step": "wait_ms", "ms": 600 },
//!     { "step": "left", "participant_id": "p2" }
//!   ]
//! }
//! ```

use common::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::binding::{
    Attachment, BindingActor, BindingHooks, BindingMachine, BindingStatus, DetachReason,
    SurfaceKind, TrackProbe, TrackReadiness,
};
use crate::config::Config;
use crate::errors::BindingError;
use crate::identity::{BindingConfig, BindingTarget, ParticipantRecord, SelfIdentity};
use crate::membership::MembershipEvent;
use crate::registry::SurfaceRegistry;

/// A replay scenario.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Script {
    /// Consumer surface id used in logs and the report.
    #[serde(default = "default_consumer")]
    pub consumer: String,
    #[serde(default)]
    pub surface: SurfaceKind,
    #[serde(default)]
    pub config: BindingConfig,
    pub steps: Vec<Step>,
}

fn default_consumer() -> String {
    "replay".to_string()
}

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Connected {
        self_identity: SelfIdentity,
        #[serde(default)]
        participants: Vec<ParticipantRecord>,
    },
    Joined {
        participant: ParticipantRecord,
    },
    Left {
        participant_id: ParticipantId,
    },
    SetConfig {
        config: BindingConfig,
    },
    /// Change what the probe reports for a participant.
    Track {
        participant_id: ParticipantId,
        readiness: TrackReadiness,
    },
    /// Let time pass so scheduled re-probes can fire.
    WaitMs {
        ms: u64,
    },
    Reevaluate,
    RegisterSurface {
        key: String,
    },
    UnregisterSurface {
        key: String,
    },
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Connected { .. } => "connected",
            Step::Joined { .. } => "joined",
            Step::Left { .. } => "left",
            Step::SetConfig { .. } => "set_config",
            Step::Track { .. } => "track",
            Step::WaitMs { .. } => "wait_ms",
            Step::Reevaluate => "reevaluate",
            Step::RegisterSurface { .. } => "register_surface",
            Step::UnregisterSurface { .. } => "unregister_surface",
        }
    }
}

impl Script {
    /// Load a script from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, BindingError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BindingError::Script(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, BindingError> {
        serde_json::from_str(raw).map_err(|e| BindingError::Script(e.to_string()))
    }
}

/// Probe answering from a table the script edits. Unknown participants
/// have no track.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    tracks: Arc<Mutex<HashMap<ParticipantId, TrackReadiness>>>,
}

impl ScriptedProbe {
    pub fn set(&self, participant_id: ParticipantId, readiness: TrackReadiness) {
        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant_id, readiness);
    }
}

impl TrackProbe for ScriptedProbe {
    fn readiness(&self, target: &BindingTarget) -> TrackReadiness {
        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target.id())
            .copied()
            .unwrap_or_default()
    }
}

/// Side effect observed during a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Bound {
        at_ms: u64,
        attachment: Attachment,
    },
    Unbound {
        at_ms: u64,
        target: BindingTarget,
        reason: DetachReason,
    },
    GaveUp {
        at_ms: u64,
        target: BindingTarget,
        attempts: u32,
    },
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub consumer_id: String,
    pub events: Vec<ReplayEvent>,
    pub final_status: BindingStatus,
    /// Share targets on offer when the script finished.
    pub share_candidates: Vec<String>,
}

/// Hooks that log and record every side effect with its offset from start.
struct ReplayRecorder {
    consumer_id: String,
    started: Instant,
    events: Arc<Mutex<Vec<ReplayEvent>>>,
}

impl ReplayRecorder {
    fn at_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn push(&self, event: ReplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl BindingHooks for ReplayRecorder {
    fn on_bound(&mut self, attachment: &Attachment) {
        let at_ms = self.at_ms();
        info!(
            target: "tb.replay",
            consumer_id = %self.consumer_id,
            at_ms = at_ms,
            participant_id = %attachment.target.id(),
            media_element = %attachment.media_element,
            renegotiate_upload = attachment.needs_upload_renegotiation(),
            "Attached"
        );
        self.push(ReplayEvent::Bound {
            at_ms,
            attachment: attachment.clone(),
        });
    }

    fn on_unbound(&mut self, target: &BindingTarget, reason: DetachReason) {
        let at_ms = self.at_ms();
        info!(
            target: "tb.replay",
            consumer_id = %self.consumer_id,
            at_ms = at_ms,
            participant_id = %target.id(),
            reason = reason.as_str(),
            "Detached"
        );
        self.push(ReplayEvent::Unbound {
            at_ms,
            target: target.clone(),
            reason,
        });
    }

    fn on_gave_up(&mut self, target: &BindingTarget, attempts: u32) {
        let at_ms = self.at_ms();
        warn!(
            target: "tb.replay",
            consumer_id = %self.consumer_id,
            at_ms = at_ms,
            participant_id = %target.id(),
            attempts = attempts,
            "Gave up waiting for track"
        );
        self.push(ReplayEvent::GaveUp {
            at_ms,
            target: target.clone(),
            attempts,
        });
    }
}

/// Run `script` to completion and report what happened.
pub async fn run_script(script: Script, config: &Config) -> Result<ReplayReport, BindingError> {
    let probe = ScriptedProbe::default();
    let events = Arc::new(Mutex::new(Vec::new()));
    let registry: SurfaceRegistry<String> = SurfaceRegistry::named(script.consumer.clone());

    let recorder = ReplayRecorder {
        consumer_id: script.consumer.clone(),
        started: Instant::now(),
        events: Arc::clone(&events),
    };

    let machine = BindingMachine::new(
        script.consumer.clone(),
        script.surface,
        script.config,
        config.retry_policy(),
        Arc::new(probe.clone()),
        Box::new(recorder),
    );
    let (handle, task) =
        BindingActor::spawn(machine, config.mailbox_buffer, CancellationToken::new());

    info!(
        target: "tb.replay",
        consumer_id = %script.consumer,
        steps = script.steps.len(),
        "Replay started"
    );

    for (index, step) in script.steps.into_iter().enumerate() {
        debug!(target: "tb.replay", index = index, step = step.as_str(), "Step");

        match step {
            Step::Connected {
                self_identity,
                participants,
            } => {
                handle
                    .notify(MembershipEvent::Connected {
                        self_identity,
                        participants,
                    })
                    .await?;
            }
            Step::Joined { participant } => {
                handle
                    .notify(MembershipEvent::ParticipantJoined { participant })
                    .await?;
            }
            Step::Left { participant_id } => {
                handle
                    .notify(MembershipEvent::ParticipantLeft { participant_id })
                    .await?;
            }
            Step::SetConfig { config } => handle.set_config(config).await?,
            Step::Track {
                participant_id,
                readiness,
            } => probe.set(participant_id, readiness),
            Step::WaitMs { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            Step::Reevaluate => handle.reevaluate().await?,
            Step::RegisterSurface { key } => {
                let value = key.clone();
                registry.register(&key, value);
            }
            Step::UnregisterSurface { key } => registry.unregister(&key),
        }

        // Round trip so the step is fully applied before the next one
        let _ = handle.status().await?;
    }

    let final_status = handle.status().await?;

    handle.cancel();
    task.await
        .map_err(|e| BindingError::Internal(format!("binding task failed: {e}")))?;

    let events = events
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    info!(
        target: "tb.replay",
        consumer_id = %final_status.consumer_id,
        state = final_status.state.as_str(),
        events = events.len(),
        "Replay finished"
    );

    Ok(ReplayReport {
        consumer_id: final_status.consumer_id.clone(),
        events,
        final_status,
        share_candidates: registry.candidates_or(&config.default_share_target),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::binding::BindingState;

    const BOB_LOADS_SLOWLY: &str = r#"{
        "consumer": "bob-panel",
        "config": { "display_name": "bob" },
        "steps": [
            { "step": "connected",
              "self_identity": { "id": "p0", "display_name": "carol" },
              "participants": [
                { "id": "p1", "display_name": "alice" },
                { "id": "p2", "display_name": "bob" }
              ] },
            { "step": "wait_ms", "ms": 1200 },
            { "step": "track", "participant_id": "p2", "readiness": "ready" },
            { "step": "wait_ms", "ms": 600 },
            { "step": "left", "participant_id": "p2" }
        ]
    }"#;

    #[test]
    fn test_parse_script() {
        let script = Script::from_json(BOB_LOADS_SLOWLY).unwrap();
        assert_eq!(script.consumer, "bob-panel");
        assert_eq!(script.surface, SurfaceKind::Flat);
        assert_eq!(script.config, BindingConfig::by_display_name("bob"));
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[1], Step::WaitMs { ms: 1200 });
    }

    #[test]
    fn test_parse_errors_are_script_errors() {
        let err = Script::from_json(r#"{ "steps": [{ "step": "dance" }] }"#).unwrap_err();
        assert!(matches!(err, BindingError::Script(_)));

        let err = Script::from_path(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(matches!(err, BindingError::Script(_)));
    }

    #[test]
    fn test_scripted_probe_defaults_to_no_track() {
        let probe = ScriptedProbe::default();
        let target = BindingTarget::Remote("p2".into());
        assert_eq!(probe.readiness(&target), TrackReadiness::NoTrack);

        probe.set("p2".into(), TrackReadiness::Loading);
        assert_eq!(probe.readiness(&target), TrackReadiness::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_binds_after_track_arrives_then_unbinds() {
        let script = Script::from_json(BOB_LOADS_SLOWLY).unwrap();
        let report = run_script(script, &Config::default()).await.unwrap();

        assert_eq!(report.consumer_id, "bob-panel");
        assert_eq!(report.events.len(), 2);

        // Track became ready at ~1200ms; next re-probe is on the 500ms grid
        let ReplayEvent::Bound { at_ms, attachment } = &report.events[0] else {
            panic!("expected bind first, got {:?}", report.events);
        };
        assert_eq!(*at_ms, 1500);
        assert_eq!(attachment.media_element, "videop2");

        assert!(matches!(
            &report.events[1],
            ReplayEvent::Unbound {
                reason: DetachReason::ParticipantLeft,
                ..
            }
        ));
        assert_eq!(report.final_status.state, BindingState::Unbound);
        assert_eq!(report.share_candidates, vec!["screenshare"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_honors_retry_cap() {
        let script = Script::from_json(
            r#"{
                "config": { "explicit_id": "p7" },
                "steps": [{ "step": "wait_ms", "ms": 5000 }]
            }"#,
        )
        .unwrap();
        let config = Config {
            max_retry_attempts: Some(3),
            ..Config::default()
        };

        let report = run_script(script, &config).await.unwrap();
        assert_eq!(
            report.events,
            vec![ReplayEvent::GaveUp {
                at_ms: 1000,
                target: BindingTarget::Remote("p7".into()),
                attempts: 3,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_share_candidates() {
        let script = Script::from_json(
            r#"{
                "steps": [
                    { "step": "register_surface", "key": "wall" },
                    { "step": "register_surface", "key": " table " },
                    { "step": "unregister_surface", "key": "wall" }
                ]
            }"#,
        )
        .unwrap();

        let report = run_script(script, &Config::default()).await.unwrap();
        assert_eq!(report.share_candidates, vec!["table"]);
        assert!(report.events.is_empty());
    }
}
