//! Prometheus metrics for the SnapChef backend.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Generation attempts by tier and outcome (ok, no_food, bad_output, error)
    pub static ref GENERATION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "snapchef_generation_total",
        "Recipe generation attempts by tier and outcome",
        &["tier", "outcome"]
    )
    .unwrap();

    /// Generation latency in seconds, upload and model call included
    pub static ref GENERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "snapchef_generation_duration_seconds",
        "Recipe generation latency in seconds",
        &["tier"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0]
    )
    .unwrap();

    /// Scans removed by the retention sweep
    pub static ref SCANS_EVICTED_TOTAL: IntCounter = register_int_counter!(
        "snapchef_scans_evicted_total",
        "Scans removed by the retention sweep"
    )
    .unwrap();

    /// Requests rejected by quota policy (cooldown, weekly_limit, regen_limit)
    pub static ref QUOTA_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "snapchef_quota_rejections_total",
        "Requests rejected by quota policy",
        &["kind"]
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_registered_metrics() {
        GENERATION_TOTAL.with_label_values(&["free", "ok"]).inc();
        let output = render();
        assert!(output.contains("snapchef_generation_total"));
    }
}
