//! Binding state machine and its actor.
//!
//! One binding exists per consumer surface. The [`BindingMachine`] owns the
//! lifecycle:
//!
//! ```text
//!               resolve ok            probe ready
//! Unresolved ───────────────► Probing ────────────► Bound
//!     ▲   ▲                    │  ▲                   │
//!     │   │   resolve none     │  │ not ready         │ participant left
//!     │   └────────────────────┘  └─ retry(ticket)    ▼
//!     └──────────────── next trigger ───────────── Unbound
//! ```
//!
//! Config changes move `Bound` straight back to `Unresolved`.
//!
//! # Key Design Decisions
//!
//! - **Generation-tagged retries**: every re-resolution bumps a generation
//!   counter; a [`RetryTicket`] carrying an older generation is discarded.
//! - **No failure state**: unresolved identities and unready tracks are
//!   retried, never reported as errors.
//! - **Local vs remote decided once**: [`BindingTarget`](crate::identity::BindingTarget)
//!   is tagged at resolution time and flows into the [`Attachment`].
//!
//! # Modules
//!
//! - [`machine`] - `BindingMachine`, the pure state machine
//! - [`actor`] - `BindingActor` running one machine on its own task
//! - [`messages`] - Mailbox message types
//! - [`probe`] - Track readiness seam
//! - [`hooks`] - Attach/detach seam
//! - [`attachment`] - What gets attached and how quality is negotiated
//! - [`state`] - States, retry policy, tickets, status snapshots

pub mod actor;
pub mod attachment;
pub mod hooks;
pub mod machine;
pub mod messages;
pub mod probe;
pub mod state;

// Re-export primary types
pub use actor::{BindingActor, BindingActorHandle};
pub use attachment::{Attachment, QualityRequest, SurfaceKind, LOCAL_PREVIEW_ELEMENT};
pub use hooks::{BindingHooks, CallbackHooks, DetachReason};
pub use machine::BindingMachine;
pub use messages::BindingMessage;
pub use probe::{TrackProbe, TrackReadiness};
pub use state::{BindingState, BindingStatus, Next, RetryPolicy, RetryTicket};
