//! Message types for the binding actor mailbox.

use common::types::ParticipantId;
use tokio::sync::oneshot;

use super::state::{BindingStatus, RetryTicket};
use crate::identity::BindingConfig;
use crate::membership::MembershipEvent;

/// Messages handled by a `BindingActor`.
#[derive(Debug)]
pub enum BindingMessage {
    /// Conference membership changed.
    Membership(MembershipEvent),

    /// Replace the binding config.
    SetConfig { config: BindingConfig },

    /// Re-run resolution (also restarts a binding that gave up).
    Reevaluate,

    /// A scheduled re-probe is due. Sent by the actor's own timer tasks.
    RetryFired(RetryTicket),

    /// Query the bound participant.
    GetBinding {
        respond_to: oneshot::Sender<Option<ParticipantId>>,
    },

    /// Query the full binding status.
    GetStatus {
        respond_to: oneshot::Sender<BindingStatus>,
    },
}
