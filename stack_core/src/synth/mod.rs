//! Configuration document synthesis.
//!
//! [`synthesize`] is a pure function of the service list and a port
//! assignment. Inside the engine network services reach each other by
//! service name and fixed container port, so host ports appear only in the
//! orchestration manifest's port mappings.

mod collector;
mod manifest;
mod prometheus;
mod tempo;

use std::fmt;

use serde::Serialize;

use stack_config::{ImagesConfig, COLLECTOR_CONFIG_FILE, MANIFEST_FILE, PROMETHEUS_CONFIG_FILE, TEMPO_CONFIG_FILE};
use stack_shared_types::service::spec_for;
use stack_shared_types::{PortAssignment, PortRole, ServiceSpec, StackError};

/// First line of every generated document.
pub const GENERATED_HEADER: &str =
    "# Generated by `a2a init`. Manual edits are lost when the stack is re-provisioned.\n";

/// The four generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    CollectorConfig,
    MetricsScraperConfig,
    TraceBackendConfig,
    OrchestrationManifest,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::CollectorConfig,
        DocumentKind::MetricsScraperConfig,
        DocumentKind::TraceBackendConfig,
        DocumentKind::OrchestrationManifest,
    ];

    /// File name inside the data directory. The manifest mounts the others
    /// by these relative names.
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::CollectorConfig => COLLECTOR_CONFIG_FILE,
            DocumentKind::MetricsScraperConfig => PROMETHEUS_CONFIG_FILE,
            DocumentKind::TraceBackendConfig => TEMPO_CONFIG_FILE,
            DocumentKind::OrchestrationManifest => MANIFEST_FILE,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Rendered documents of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDocuments {
    pub collector: String,
    pub metrics_scraper: String,
    pub trace_backend: String,
    pub manifest: String,
}

impl StackDocuments {
    pub fn get(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::CollectorConfig => &self.collector,
            DocumentKind::MetricsScraperConfig => &self.metrics_scraper,
            DocumentKind::TraceBackendConfig => &self.trace_backend,
            DocumentKind::OrchestrationManifest => &self.manifest,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentKind, &str)> + '_ {
        DocumentKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Render every document for `specs` bound to `assignment`.
pub fn synthesize(
    specs: &[ServiceSpec],
    assignment: &PortAssignment,
    images: &ImagesConfig,
) -> Result<StackDocuments, StackError> {
    let topology = Topology { specs, assignment };

    Ok(StackDocuments {
        collector: collector::render(&topology)?,
        metrics_scraper: prometheus::render(&topology)?,
        trace_backend: tempo::render(&topology)?,
        manifest: manifest::render(&topology, images)?,
    })
}

/// Lookup helpers over the inputs of one synthesis.
pub(crate) struct Topology<'a> {
    specs: &'a [ServiceSpec],
    assignment: &'a PortAssignment,
}

impl<'a> Topology<'a> {
    fn spec(&self, role: PortRole) -> Result<&'a ServiceSpec, StackError> {
        spec_for(self.specs, role)
            .ok_or_else(|| StackError::InvalidState(format!("no service declared for role {}", role)))
    }

    /// Fixed port the role listens on inside its container.
    pub(crate) fn container_port(&self, role: PortRole) -> Result<u16, StackError> {
        self.spec(role)?.container_port.ok_or_else(|| {
            StackError::InvalidState(format!("role {} has no container port", role))
        })
    }

    /// `service:port` address of a role inside the engine network.
    pub(crate) fn internal_address(&self, role: PortRole) -> Result<String, StackError> {
        let spec = self.spec(role)?;
        Ok(format!("{}:{}", spec.service, self.container_port(role)?))
    }

    /// `0.0.0.0:port` listen address of a role inside its own container.
    pub(crate) fn listen_address(&self, role: PortRole) -> Result<String, StackError> {
        Ok(format!("0.0.0.0:{}", self.container_port(role)?))
    }

    /// Engine-managed specs of one service, in declaration order.
    pub(crate) fn service_specs<'b>(&'b self, service: &'b str) -> impl Iterator<Item = &'a ServiceSpec> + 'b {
        self.specs
            .iter()
            .filter(move |s| s.service == service && s.is_engine_managed())
    }

    pub(crate) fn host_port(&self, role: PortRole) -> Result<u16, StackError> {
        self.assignment
            .get(role)
            .ok_or_else(|| StackError::InvalidState(format!("no host port assigned for role {}", role)))
    }
}

pub(crate) fn to_yaml<T: Serialize>(doc: &T) -> Result<String, StackError> {
    let body = serde_yaml::to_string(doc)
        .map_err(|e| StackError::InvalidState(format!("failed to render YAML: {}", e)))?;
    Ok(format!("{}{}", GENERATED_HEADER, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_shared_types::default_services;

    /// Host ports chosen to differ from every container port.
    fn distinct_assignment() -> PortAssignment {
        PortRole::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| (*role, 51001 + i as u16))
            .collect()
    }

    fn render() -> StackDocuments {
        synthesize(default_services(), &distinct_assignment(), &ImagesConfig::default()).unwrap()
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let first = render();
        let second = render();
        assert_eq!(first, second);
    }

    #[test]
    fn test_host_ports_only_in_manifest() {
        let docs = render();
        let assignment = distinct_assignment();

        for (kind, text) in docs.iter() {
            for (role, host) in assignment.iter() {
                let found = text.contains(&host.to_string());
                if kind == DocumentKind::OrchestrationManifest && role != PortRole::Dashboard {
                    assert!(found, "manifest should map host port {} for {}", host, role);
                } else {
                    assert!(!found, "{} leaks host port {} of {}", kind, host, role);
                }
            }
        }
    }

    #[test]
    fn test_cross_references_use_service_names() {
        let docs = render();
        assert!(docs.collector.contains("http://loki:3100/otlp"));
        assert!(docs.collector.contains("tempo:4317"));
        assert!(docs.metrics_scraper.contains("otel-collector:9464"));
        assert!(!docs.collector.contains("localhost"));
        assert!(!docs.metrics_scraper.contains("localhost"));
    }

    #[test]
    fn test_every_document_has_header() {
        for (_, text) in render().iter() {
            assert!(text.starts_with(GENERATED_HEADER));
        }
    }

    #[test]
    fn test_missing_assignment_is_rejected() {
        let partial: PortAssignment = distinct_assignment()
            .iter()
            .filter(|(role, _)| *role != PortRole::TempoGrpc)
            .collect();
        let err = synthesize(default_services(), &partial, &ImagesConfig::default()).unwrap_err();
        assert!(err.to_string().contains("tempoGrpc"));
    }

    #[test]
    fn test_manifest_maps_host_to_container() {
        let docs = render();
        let assignment = distinct_assignment();
        let grpc_host = assignment.get(PortRole::CollectorGrpc).unwrap();
        assert!(docs.manifest.contains(&format!("{}:4317", grpc_host)));
    }
}
