//! The persisted stack state.
//!
//! Serialized as:
//!
//! ```json
//! {
//!   "collector": { "endpointHttp": "...", "endpointGrpc": "...", "token": "..." },
//!   "ports": { "prometheus": 9090, "loki": 3100, "tempoHttp": 3200,
//!              "tempoGrpc": 9095, "prometheusExporter": 9464, "dashboard": 4000 }
//! }
//! ```
//!
//! Every field is required; a document missing one fails to decode.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StackError};
use crate::service::{PortAssignment, PortRole};

/// Host every endpoint in the state points at.
pub const LOCAL_HOST: &str = "localhost";

/// Collector endpoints handed to agents, plus their bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectorState {
    pub endpoint_http: String,
    pub endpoint_grpc: String,
    pub token: String,
}

/// Host ports by logical role. The collector ports live in the endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StackPorts {
    pub prometheus: u16,
    pub loki: u16,
    pub tempo_http: u16,
    pub tempo_grpc: u16,
    pub prometheus_exporter: u16,
    pub dashboard: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackState {
    pub collector: CollectorState,
    pub ports: StackPorts,
}

/// OTLP/HTTP trace endpoint for a collector host port.
pub fn collector_http_endpoint(port: u16) -> String {
    format!("http://{}:{}/v1/traces", LOCAL_HOST, port)
}

/// OTLP/gRPC endpoint for a collector host port.
pub fn collector_grpc_endpoint(port: u16) -> String {
    format!("http://{}:{}", LOCAL_HOST, port)
}

impl StackState {
    /// Build a fresh state from a complete assignment.
    pub fn from_assignment(assignment: &PortAssignment, token: impl Into<String>) -> Result<Self> {
        let port = |role: PortRole| {
            assignment.get(role).ok_or_else(|| {
                StackError::InvalidState(format!("no host port assigned for role {}", role))
            })
        };

        Ok(Self {
            collector: CollectorState {
                endpoint_http: collector_http_endpoint(port(PortRole::CollectorHttp)?),
                endpoint_grpc: collector_grpc_endpoint(port(PortRole::CollectorGrpc)?),
                token: token.into(),
            },
            ports: StackPorts {
                prometheus: port(PortRole::Prometheus)?,
                loki: port(PortRole::Loki)?,
                tempo_http: port(PortRole::TempoHttp)?,
                tempo_grpc: port(PortRole::TempoGrpc)?,
                prometheus_exporter: port(PortRole::PrometheusExporter)?,
                dashboard: port(PortRole::Dashboard)?,
            },
        })
    }

    /// Current host port for a role.
    ///
    /// Collector ports are read back out of the endpoint strings; a
    /// scheme-default port counts, an unparseable endpoint yields `None`.
    pub fn port(&self, role: PortRole) -> Option<u16> {
        match role {
            PortRole::CollectorHttp => endpoint_port(&self.collector.endpoint_http),
            PortRole::CollectorGrpc => endpoint_port(&self.collector.endpoint_grpc),
            PortRole::PrometheusExporter => Some(self.ports.prometheus_exporter),
            PortRole::Prometheus => Some(self.ports.prometheus),
            PortRole::Loki => Some(self.ports.loki),
            PortRole::TempoHttp => Some(self.ports.tempo_http),
            PortRole::TempoGrpc => Some(self.ports.tempo_grpc),
            PortRole::Dashboard => Some(self.ports.dashboard),
        }
    }

    /// Overwrite the host port of one role.
    ///
    /// Collector roles regenerate the whole endpoint string.
    pub fn set_port(&mut self, role: PortRole, port: u16) {
        match role {
            PortRole::CollectorHttp => self.collector.endpoint_http = collector_http_endpoint(port),
            PortRole::CollectorGrpc => self.collector.endpoint_grpc = collector_grpc_endpoint(port),
            PortRole::PrometheusExporter => self.ports.prometheus_exporter = port,
            PortRole::Prometheus => self.ports.prometheus = port,
            PortRole::Loki => self.ports.loki = port,
            PortRole::TempoHttp => self.ports.tempo_http = port,
            PortRole::TempoGrpc => self.ports.tempo_grpc = port,
            PortRole::Dashboard => self.ports.dashboard = port,
        }
    }

    /// Host-side base URL of the log store.
    pub fn loki_url(&self) -> String {
        format!("http://{}:{}", LOCAL_HOST, self.ports.loki)
    }

    pub fn prometheus_url(&self) -> String {
        format!("http://{}:{}", LOCAL_HOST, self.ports.prometheus)
    }

    pub fn tempo_url(&self) -> String {
        format!("http://{}:{}", LOCAL_HOST, self.ports.tempo_http)
    }
}

fn endpoint_port(endpoint: &str) -> Option<u16> {
    Url::parse(endpoint).ok().and_then(|url| url.port_or_known_default())
}
