//! Prometheus metrics for the query proxy.

use metrics_exporter_prometheus::PrometheusBuilder;

pub use metrics_exporter_prometheus::PrometheusHandle;

use crate::ObservabilityError;

pub const REQUESTS_TOTAL: &str = "query_proxy_requests_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "query_proxy_upstream_errors_total";

/// Install the global Prometheus recorder and describe the proxy metrics.
///
/// The returned handle renders the exposition text; no listener is started.
pub fn install_recorder() -> Result<PrometheusHandle, ObservabilityError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Dashboard requests handled, by endpoint");
    metrics::describe_counter!(
        UPSTREAM_ERRORS_TOTAL,
        "Failed calls to the log backend, by error kind"
    );
}

pub fn record_request(endpoint: &'static str) {
    metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!(UPSTREAM_ERRORS_TOTAL, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("query_range");
            record_request("query_range");
            record_upstream_error("upstream_unreachable");
        });

        let text = handle.render();
        assert!(text.contains(r#"query_proxy_requests_total{endpoint="query_range"} 2"#));
        assert!(text.contains(r#"query_proxy_upstream_errors_total{kind="upstream_unreachable"} 1"#));
    }
}
