//! Backend service specifications.
//!
//! Every exposed port of the stack is described by one [`ServiceSpec`]. The
//! container port is stable across runs; the host port is chosen per run by
//! the port allocator and recorded in a [`PortAssignment`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Network name of the OpenTelemetry collector inside the engine network.
pub const COLLECTOR_SERVICE: &str = "otel-collector";
/// Network name of the metrics store.
pub const PROMETHEUS_SERVICE: &str = "prometheus";
/// Network name of the log store.
pub const LOKI_SERVICE: &str = "loki";
/// Network name of the trace store.
pub const TEMPO_SERVICE: &str = "tempo";
/// The dashboard runs on the host, not inside the engine.
pub const DASHBOARD_SERVICE: &str = "dashboard";

/// Wire protocol spoken on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Grpc,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Grpc => write!(f, "grpc"),
        }
    }
}

/// Logical role of a host port in the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortRole {
    CollectorHttp,
    CollectorGrpc,
    PrometheusExporter,
    Prometheus,
    Loki,
    TempoHttp,
    TempoGrpc,
    Dashboard,
}

impl PortRole {
    /// All roles in declaration order.
    pub const ALL: [PortRole; 8] = [
        PortRole::CollectorHttp,
        PortRole::CollectorGrpc,
        PortRole::PrometheusExporter,
        PortRole::Prometheus,
        PortRole::Loki,
        PortRole::TempoHttp,
        PortRole::TempoGrpc,
        PortRole::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PortRole::CollectorHttp => "collectorHttp",
            PortRole::CollectorGrpc => "collectorGrpc",
            PortRole::PrometheusExporter => "prometheusExporter",
            PortRole::Prometheus => "prometheus",
            PortRole::Loki => "loki",
            PortRole::TempoHttp => "tempoHttp",
            PortRole::TempoGrpc => "tempoGrpc",
            PortRole::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exposed port of one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Network name of the owning service inside the engine network.
    pub service: &'static str,
    /// Role this port plays in the persisted state. Unique across the list.
    pub role: PortRole,
    /// Where the allocator starts scanning on the host.
    pub preferred_host_port: u16,
    /// Fixed listening port inside the container. `None` for host processes.
    pub container_port: Option<u16>,
    pub protocol: Protocol,
}

impl ServiceSpec {
    pub const fn new(
        service: &'static str,
        role: PortRole,
        preferred_host_port: u16,
        container_port: Option<u16>,
        protocol: Protocol,
    ) -> Self {
        Self {
            service,
            role,
            preferred_host_port,
            container_port,
            protocol,
        }
    }

    /// Whether this port runs inside the orchestration engine.
    pub fn is_engine_managed(&self) -> bool {
        self.container_port.is_some()
    }
}

const DEFAULT_SERVICES: [ServiceSpec; 8] = [
    ServiceSpec::new(COLLECTOR_SERVICE, PortRole::CollectorHttp, 4318, Some(4318), Protocol::Http),
    ServiceSpec::new(COLLECTOR_SERVICE, PortRole::CollectorGrpc, 55680, Some(4317), Protocol::Grpc),
    ServiceSpec::new(COLLECTOR_SERVICE, PortRole::PrometheusExporter, 9464, Some(9464), Protocol::Http),
    ServiceSpec::new(PROMETHEUS_SERVICE, PortRole::Prometheus, 9090, Some(9090), Protocol::Http),
    ServiceSpec::new(LOKI_SERVICE, PortRole::Loki, 3100, Some(3100), Protocol::Http),
    ServiceSpec::new(TEMPO_SERVICE, PortRole::TempoHttp, 3200, Some(3200), Protocol::Http),
    ServiceSpec::new(TEMPO_SERVICE, PortRole::TempoGrpc, 9095, Some(4317), Protocol::Grpc),
    ServiceSpec::new(DASHBOARD_SERVICE, PortRole::Dashboard, 4000, None, Protocol::Http),
];

/// The stack's service list, in allocation order.
pub fn default_services() -> &'static [ServiceSpec] {
    &DEFAULT_SERVICES
}

/// Look up the spec for a role in a service list.
pub fn spec_for(specs: &[ServiceSpec], role: PortRole) -> Option<&ServiceSpec> {
    specs.iter().find(|s| s.role == role)
}

/// Host ports chosen for one provisioning run, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAssignment {
    ports: BTreeMap<PortRole, u16>,
}

impl PortAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: PortRole, port: u16) -> Option<u16> {
        self.ports.insert(role, port)
    }

    pub fn get(&self, role: PortRole) -> Option<u16> {
        self.ports.get(&role).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortRole, u16)> + '_ {
        self.ports.iter().map(|(role, port)| (*role, *port))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl FromIterator<(PortRole, u16)> for PortAssignment {
    fn from_iter<I: IntoIterator<Item = (PortRole, u16)>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_roles_are_unique() {
        let roles: HashSet<_> = default_services().iter().map(|s| s.role).collect();
        assert_eq!(roles.len(), default_services().len());
        assert_eq!(roles.len(), PortRole::ALL.len());
    }

    #[test]
    fn test_only_dashboard_runs_on_host() {
        let host_only: Vec<_> = default_services()
            .iter()
            .filter(|s| !s.is_engine_managed())
            .map(|s| s.role)
            .collect();
        assert_eq!(host_only, vec![PortRole::Dashboard]);
    }

    #[test]
    fn test_role_serializes_camel_case() {
        let json = serde_json::to_string(&PortRole::PrometheusExporter).unwrap();
        assert_eq!(json, "\"prometheusExporter\"");
        assert_eq!(PortRole::TempoGrpc.to_string(), "tempoGrpc");
    }
}
