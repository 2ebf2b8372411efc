//! Identity resolution.
//!
//! Maps a consumer's configured identity (explicit participant id, or display
//! name) onto the participant id that currently carries it. Resolution is a
//! pure function of the config, the local participant and the membership
//! snapshot; an absent match is a normal outcome.

use common::types::ParticipantId;
use serde::{Deserialize, Serialize};

/// Which media source a consumer wants.
///
/// An explicit id takes precedence over a display name. Changing either
/// field invalidates any current binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Participant id; when set, no membership lookup is performed.
    pub explicit_id: Option<ParticipantId>,
    /// Display name to look up in the membership snapshot.
    pub display_name: Option<String>,
}

impl BindingConfig {
    /// Config that binds to a participant id directly.
    #[must_use]
    pub fn by_id(id: impl Into<ParticipantId>) -> Self {
        Self {
            explicit_id: Some(id.into()),
            display_name: None,
        }
    }

    /// Config that binds by display name.
    #[must_use]
    pub fn by_display_name(name: impl Into<String>) -> Self {
        Self {
            explicit_id: None,
            display_name: Some(name.into()),
        }
    }

    /// Display name to match, if any. Empty names count as absent.
    fn wanted_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|n| !n.is_empty())
    }
}

/// A conference member as reported by the membership source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub display_name: String,
}

impl ParticipantRecord {
    #[must_use]
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The local participant.
pub type SelfIdentity = ParticipantRecord;

/// Resolved binding target, tagged once at resolution time.
///
/// `Local` targets need an upload renegotiation on attach; `Remote` targets
/// only get a receive-side hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BindingTarget {
    Local(ParticipantId),
    Remote(ParticipantId),
}

impl BindingTarget {
    /// The participant id behind the target.
    #[must_use]
    pub fn id(&self) -> &ParticipantId {
        match self {
            BindingTarget::Local(id) | BindingTarget::Remote(id) => id,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, BindingTarget::Local(_))
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            BindingTarget::Local(_) => "local",
            BindingTarget::Remote(_) => "remote",
        }
    }
}

/// Latest known conference membership as seen by one consumer.
///
/// Participants are kept in arrival order so that duplicate display names
/// resolve deterministically to the earliest record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    self_identity: Option<SelfIdentity>,
    participants: Vec<ParticipantRecord>,
}

impl Roster {
    #[must_use]
    pub fn new(self_identity: Option<SelfIdentity>, participants: Vec<ParticipantRecord>) -> Self {
        Self {
            self_identity,
            participants,
        }
    }

    #[must_use]
    pub fn self_identity(&self) -> Option<&SelfIdentity> {
        self.self_identity.as_ref()
    }

    #[must_use]
    pub fn participants(&self) -> &[ParticipantRecord] {
        &self.participants
    }

    /// Replace the whole roster (connect / reconnect).
    pub fn reset(&mut self, self_identity: SelfIdentity, participants: Vec<ParticipantRecord>) {
        self.self_identity = Some(self_identity);
        self.participants = participants;
    }

    /// Add a participant, or update the display name of a known one in place.
    pub fn upsert(&mut self, record: ParticipantRecord) {
        match self.participants.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => existing.display_name = record.display_name,
            None => self.participants.push(record),
        }
    }

    /// Remove a participant. Returns the removed record if it was present.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<ParticipantRecord> {
        let pos = self.participants.iter().position(|p| &p.id == id)?;
        Some(self.participants.remove(pos))
    }

    /// Resolve `config` against this roster.
    #[must_use]
    pub fn resolve(&self, config: &BindingConfig) -> Option<BindingTarget> {
        resolve_target(config, self.self_identity.as_ref(), &self.participants)
    }
}

/// Resolve a config to a participant id.
///
/// 1. An explicit id is returned unchanged.
/// 2. An empty or absent display name resolves to nothing.
/// 3. The local participant wins when its display name matches.
/// 4. Otherwise the first matching snapshot record wins.
#[must_use]
pub fn resolve(
    config: &BindingConfig,
    self_identity: Option<&SelfIdentity>,
    snapshot: &[ParticipantRecord],
) -> Option<ParticipantId> {
    if let Some(id) = &config.explicit_id {
        return Some(id.clone());
    }

    let name = config.wanted_name()?;

    if let Some(me) = self_identity.filter(|me| me.display_name == name) {
        return Some(me.id.clone());
    }

    snapshot
        .iter()
        .find(|p| p.display_name == name)
        .map(|p| p.id.clone())
}

/// Resolve a config and tag the result as local or remote.
#[must_use]
pub fn resolve_target(
    config: &BindingConfig,
    self_identity: Option<&SelfIdentity>,
    snapshot: &[ParticipantRecord],
) -> Option<BindingTarget> {
    let id = resolve(config, self_identity, snapshot)?;
    let is_self = self_identity.is_some_and(|me| me.id == id);
    Some(if is_self {
        BindingTarget::Local(id)
    } else {
        BindingTarget::Remote(id)
    })
}
