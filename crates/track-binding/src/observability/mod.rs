//! Observability for the binding core.
//!
//! Metrics go through the `metrics` facade; installing a recorder/exporter is
//! left to the embedding process. Labels are bounded:
//! - `target`: 2 values (local, remote)
//! - `reason`: bounded by `Deferral` and `DetachReason`
//! - `readiness`: bounded by `TrackReadiness`
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `tb_binding_attach_total` | Counter | `target` | Entries into `Bound` |
//! | `tb_binding_detach_total` | Counter | `reason` | Exits from `Bound` |
//! | `tb_binding_deferral_total` | Counter | `reason` | Evaluations that did not bind |
//! | `tb_probe_not_ready_total` | Counter | `readiness` | Not-ready probe results |
//! | `tb_retry_gave_up_total` | Counter | none | Retry cap reached |
//! | `tb_registry_entries` | Gauge | none | Registered share surfaces |

pub mod metrics;

/// `EnvFilter` directives used when `RUST_LOG` is unset.
///
/// Library events use explicit `tb.*` targets; the binary logs under its
/// module path.
pub const DEFAULT_LOG_FILTER: &str = "tb=debug,track_binding=debug";

pub use metrics::{
    record_attach, record_deferral, record_detach, record_probe_not_ready, record_retry_gave_up,
    set_registry_entries,
};
