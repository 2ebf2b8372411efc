//! Track Binding Library
//!
//! Resolves a logical media-source identity (a participant's display name or
//! session id) to a live media track that may not exist yet, and keeps that
//! binding correct as conference membership changes:
//!
//! - Identity resolution against the latest membership snapshot
//! - Per-consumer binding state machine with generation-tagged retries
//! - Actor wrapper that owns one binding on its own task
//! - Membership event bus with disposable subscriptions
//! - Registry of surfaces that can host the shared screen
//!
//! # Architecture
//!
//! ```text
//! MembershipBus (one per conference session)
//! └── Subscription ──forwards──► BindingActor (one per consumer surface)
//!                                └── BindingMachine
//!                                    ├── identity::resolve_target
//!                                    ├── TrackProbe   (polled until ready)
//!                                    └── BindingHooks (attach / detach)
//!
//! SurfaceRegistry (injected, consulted by presentation code only)
//! ```
//!
//! # Modules
//!
//! - [`identity`] - Identity resolver and roster types
//! - [`binding`] - State machine, actor, probe and hook seams
//! - [`membership`] - Membership events and the event bus
//! - [`registry`] - Screen-share surface registry
//! - [`config`] - Configuration from environment
//! - [`errors`] - Edge error types and deferral taxonomy
//! - [`observability`] - Metrics
//! - [`replay`] - Scenario replay used by the binary

pub mod binding;
pub mod config;
pub mod errors;
pub mod identity;
pub mod membership;
pub mod observability;
pub mod registry;
pub mod replay;
