//! Pre-configured membership fixtures.
//!
//! The standard conference: carol (`p0`) is the local participant, alice
//! (`p1`) and bob (`p2`) are remote.

use track_binding::identity::{ParticipantRecord, Roster, SelfIdentity};
use track_binding::membership::MembershipEvent;

#[must_use]
pub fn carol() -> SelfIdentity {
    ParticipantRecord::new("p0", "carol")
}

#[must_use]
pub fn alice() -> ParticipantRecord {
    ParticipantRecord::new("p1", "alice")
}

#[must_use]
pub fn bob() -> ParticipantRecord {
    ParticipantRecord::new("p2", "bob")
}

/// Remote participants in arrival order.
#[must_use]
pub fn remote_participants() -> Vec<ParticipantRecord> {
    vec![alice(), bob()]
}

#[must_use]
pub fn standard_roster() -> Roster {
    Roster::new(Some(carol()), remote_participants())
}

/// `Connected` event for the standard conference.
#[must_use]
pub fn connected_event() -> MembershipEvent {
    MembershipEvent::Connected {
        self_identity: carol(),
        participants: remote_participants(),
    }
}

#[must_use]
pub fn joined(id: &str, display_name: &str) -> MembershipEvent {
    MembershipEvent::ParticipantJoined {
        participant: ParticipantRecord::new(id, display_name),
    }
}

#[must_use]
pub fn left(id: &str) -> MembershipEvent {
    MembershipEvent::ParticipantLeft {
        participant_id: id.into(),
    }
}
