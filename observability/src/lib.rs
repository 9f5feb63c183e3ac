//! Observability for the local telemetry stack.
//!
//! - **Tracing**: `tracing-subscriber` registry with an env filter, plain or JSON output
//! - **Metrics**: Prometheus recorder rendered by the query proxy's `/metrics`

use thiserror::Error;

pub mod metrics;
pub mod tracing_setup;

pub use self::metrics::{install_recorder, record_request, record_upstream_error, PrometheusHandle};
pub use tracing_setup::{init_tracing, TracingConfig};

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
