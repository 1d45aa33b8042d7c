//! Prometheus metrics exporter for the service.
//!
//! Run and asset counters are recorded by the pipeline crate; this module
//! only installs the recorder and exposes the render handle.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}
