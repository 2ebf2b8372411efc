//! # Track Binding Test Utilities
//!
//! Shared test utilities for the track binding library.
//!
//! ## Modules
//!
//! - `mock_probe` - Scriptable `TrackProbe` with per-participant readiness
//! - `recording_hooks` - `BindingHooks` that record every call
//! - `fixtures` - Rosters and membership events (carol is local; alice and bob are remote)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tb_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let probe = MockProbe::new().with_ready("p2");
//!     let hooks = RecordingHooks::new();
//!
//!     let (handle, _task) = spawn_binding(
//!         BindingConfig::by_display_name("bob"),
//!         &probe,
//!         &hooks,
//!     );
//!     handle.notify(connected_event()).await.unwrap();
//!
//!     assert_eq!(hooks.bound_ids(), vec!["p2".into()]);
//! }
//! ```

pub mod fixtures;
pub mod mock_probe;
pub mod recording_hooks;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_probe::*;
pub use recording_hooks::*;

use std::sync::{Arc, Once};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use track_binding::binding::{
    BindingActor, BindingActorHandle, BindingMachine, RetryPolicy, SurfaceKind, TrackProbe,
};
use track_binding::identity::BindingConfig;
use track_binding::observability::DEFAULT_LOG_FILTER;

/// Mailbox capacity used by [`spawn_binding`].
pub const TEST_MAILBOX_BUFFER: usize = 16;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to [`DEFAULT_LOG_FILTER`].
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Build a flat-surface machine wired to `probe` and `hooks`.
#[must_use]
pub fn binding_machine(
    consumer_id: &str,
    config: BindingConfig,
    policy: RetryPolicy,
    probe: &MockProbe,
    hooks: &RecordingHooks,
) -> BindingMachine {
    BindingMachine::new(
        consumer_id,
        SurfaceKind::Flat,
        config,
        policy,
        Arc::new(probe.clone()) as Arc<dyn TrackProbe>,
        Box::new(hooks.clone()),
    )
}

/// Spawn a binding actor with the default retry policy.
pub fn spawn_binding(
    config: BindingConfig,
    probe: &MockProbe,
    hooks: &RecordingHooks,
) -> (BindingActorHandle, JoinHandle<()>) {
    let machine = binding_machine("test-surface", config, RetryPolicy::default(), probe, hooks);
    BindingActor::spawn(machine, TEST_MAILBOX_BUFFER, CancellationToken::new())
}
