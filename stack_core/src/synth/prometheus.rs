//! Prometheus scrape configuration: one static target, the collector's exporter.

use serde::Serialize;

use stack_shared_types::{PortRole, StackError};

use super::{to_yaml, Topology};

#[derive(Serialize)]
struct PrometheusConfig {
    global: Global,
    scrape_configs: Vec<ScrapeConfig>,
}

#[derive(Serialize)]
struct Global {
    scrape_interval: &'static str,
    evaluation_interval: &'static str,
}

#[derive(Serialize)]
struct ScrapeConfig {
    job_name: &'static str,
    static_configs: Vec<StaticConfig>,
}

#[derive(Serialize)]
struct StaticConfig {
    targets: Vec<String>,
}

pub(super) fn render(topology: &Topology<'_>) -> Result<String, StackError> {
    let config = PrometheusConfig {
        global: Global {
            scrape_interval: "15s",
            evaluation_interval: "15s",
        },
        scrape_configs: vec![ScrapeConfig {
            job_name: "otel-collector",
            static_configs: vec![StaticConfig {
                targets: vec![topology.internal_address(PortRole::PrometheusExporter)?],
            }],
        }],
    };

    to_yaml(&config)
}
