//! OpenTelemetry collector configuration.

use serde::Serialize;

use stack_shared_types::{PortRole, StackError};

use super::{to_yaml, Topology};

const OTLP_RECEIVER: &str = "otlp";
const BATCH_PROCESSOR: &str = "batch";
const PROMETHEUS_EXPORTER: &str = "prometheus";
const LOKI_EXPORTER: &str = "otlphttp/loki";
const TEMPO_EXPORTER: &str = "otlp/tempo";

#[derive(Serialize)]
struct CollectorConfig {
    receivers: Receivers,
    processors: Processors,
    exporters: Exporters,
    service: Service,
}

#[derive(Serialize)]
struct Receivers {
    otlp: OtlpReceiver,
}

#[derive(Serialize)]
struct OtlpReceiver {
    protocols: OtlpProtocols,
}

#[derive(Serialize)]
struct OtlpProtocols {
    http: Endpoint,
    grpc: Endpoint,
}

#[derive(Serialize)]
struct Endpoint {
    endpoint: String,
}

#[derive(Serialize)]
struct Processors {
    batch: BatchProcessor,
}

#[derive(Serialize)]
struct BatchProcessor {
    timeout: &'static str,
    send_batch_size: u32,
}

#[derive(Serialize)]
struct Exporters {
    prometheus: Endpoint,
    #[serde(rename = "otlphttp/loki")]
    loki: Endpoint,
    #[serde(rename = "otlp/tempo")]
    tempo: OtlpExporter,
}

#[derive(Serialize)]
struct OtlpExporter {
    endpoint: String,
    tls: Tls,
}

#[derive(Serialize)]
struct Tls {
    insecure: bool,
}

#[derive(Serialize)]
struct Service {
    pipelines: Pipelines,
}

#[derive(Serialize)]
struct Pipelines {
    traces: Pipeline,
    metrics: Pipeline,
    logs: Pipeline,
}

#[derive(Serialize)]
struct Pipeline {
    receivers: Vec<&'static str>,
    processors: Vec<&'static str>,
    exporters: Vec<&'static str>,
}

impl Pipeline {
    fn otlp_to(exporter: &'static str) -> Self {
        Self {
            receivers: vec![OTLP_RECEIVER],
            processors: vec![BATCH_PROCESSOR],
            exporters: vec![exporter],
        }
    }
}

pub(super) fn render(topology: &Topology<'_>) -> Result<String, StackError> {
    let config = CollectorConfig {
        receivers: Receivers {
            otlp: OtlpReceiver {
                protocols: OtlpProtocols {
                    http: Endpoint {
                        endpoint: topology.listen_address(PortRole::CollectorHttp)?,
                    },
                    grpc: Endpoint {
                        endpoint: topology.listen_address(PortRole::CollectorGrpc)?,
                    },
                },
            },
        },
        processors: Processors {
            batch: BatchProcessor {
                timeout: "5s",
                send_batch_size: 1024,
            },
        },
        exporters: Exporters {
            prometheus: Endpoint {
                endpoint: topology.listen_address(PortRole::PrometheusExporter)?,
            },
            loki: Endpoint {
                endpoint: format!("http://{}/otlp", topology.internal_address(PortRole::Loki)?),
            },
            tempo: OtlpExporter {
                endpoint: topology.internal_address(PortRole::TempoGrpc)?,
                tls: Tls { insecure: true },
            },
        },
        service: Service {
            pipelines: Pipelines {
                traces: Pipeline::otlp_to(TEMPO_EXPORTER),
                metrics: Pipeline::otlp_to(PROMETHEUS_EXPORTER),
                logs: Pipeline::otlp_to(LOKI_EXPORTER),
            },
        },
    };

    to_yaml(&config)
}
