//! Metric definitions for the binding core.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tb_` prefix
//! - `_total` suffix for counters

use metrics::{counter, gauge};

use crate::binding::{DetachReason, TrackReadiness};
use crate::errors::Deferral;
use crate::identity::BindingTarget;

/// Record a binding entering `Bound`.
///
/// Metric: `tb_binding_attach_total`
/// Labels: `target` (local, remote)
pub fn record_attach(target: &BindingTarget) {
    counter!("tb_binding_attach_total", "target" => target.kind()).increment(1);
}

/// Record a binding leaving `Bound`.
///
/// Metric: `tb_binding_detach_total`
/// Labels: `reason`
pub fn record_detach(reason: DetachReason) {
    counter!("tb_binding_detach_total", "reason" => reason.as_str()).increment(1);
}

/// Record an evaluation or retry that did not bind.
///
/// Metric: `tb_binding_deferral_total`
/// Labels: `reason` (no_identity, resource_not_ready, stale_callback)
pub fn record_deferral(deferral: Deferral) {
    counter!("tb_binding_deferral_total", "reason" => deferral.as_str()).increment(1);
}

/// Record a not-ready probe result.
///
/// Metric: `tb_probe_not_ready_total`
/// Labels: `readiness` (no_track, no_element, loading)
pub fn record_probe_not_ready(readiness: TrackReadiness) {
    counter!("tb_probe_not_ready_total", "readiness" => readiness.as_str()).increment(1);
}

/// Record a binding hitting its retry cap.
///
/// Metric: `tb_retry_gave_up_total`
pub fn record_retry_gave_up() {
    counter!("tb_retry_gave_up_total").increment(1);
}

/// Set the number of surfaces in one registry.
///
/// Metric: `tb_registry_entries`
/// Labels: `registry`
pub fn set_registry_entries(registry: &str, count: usize) {
    // usize to f64 conversion is safe for realistic registry sizes
    #[allow(clippy::cast_precision_loss)]
    gauge!("tb_registry_entries", "registry" => registry.to_string()).set(count as f64);
}
