//! Compose manifest: one service block per backend.
//!
//! The only generated document carrying host ports.

use std::collections::BTreeMap;

use serde::Serialize;

use stack_config::{ImagesConfig, COLLECTOR_CONFIG_FILE, PROMETHEUS_CONFIG_FILE, TEMPO_CONFIG_FILE};
use stack_shared_types::service::{COLLECTOR_SERVICE, LOKI_SERVICE, PROMETHEUS_SERVICE, TEMPO_SERVICE};
use stack_shared_types::StackError;

use super::tempo::TEMPO_DATA_DIR;
use super::{to_yaml, Topology};

/// Compose project name; containers are named `<project>-<service>-1`.
pub const PROJECT_NAME: &str = "a2a-telemetry";

const TEMPO_VOLUME: &str = "tempo-data";
const COLLECTOR_CONFIG_PATH: &str = "/etc/otelcol-contrib/config.yaml";
const PROMETHEUS_CONFIG_PATH: &str = "/etc/prometheus/prometheus.yml";
const TEMPO_CONFIG_PATH: &str = "/etc/tempo.yaml";

#[derive(Serialize)]
struct ComposeManifest {
    name: &'static str,
    services: BTreeMap<&'static str, ComposeService>,
    volumes: BTreeMap<&'static str, NamedVolume>,
}

#[derive(Serialize)]
struct ComposeService {
    image: String,
    command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<String>,
    ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<&'static str>,
    restart: &'static str,
}

#[derive(Serialize)]
struct NamedVolume {}

impl ComposeService {
    fn new(image: &str, command: &str) -> Self {
        Self {
            image: image.to_string(),
            command: vec![command.to_string()],
            volumes: Vec::new(),
            ports: Vec::new(),
            depends_on: Vec::new(),
            restart: "unless-stopped",
        }
    }

    fn mount_config(mut self, file: &str, target: &str) -> Self {
        self.volumes.push(format!("./{}:{}:ro", file, target));
        self
    }

    fn depends_on(mut self, services: &[&'static str]) -> Self {
        self.depends_on.extend_from_slice(services);
        self
    }

    /// One `host:container` pair per exposed port of `service`.
    fn publish(mut self, topology: &Topology<'_>, service: &str) -> Result<Self, StackError> {
        for spec in topology.service_specs(service) {
            let host = topology.host_port(spec.role)?;
            let container = topology.container_port(spec.role)?;
            self.ports.push(format!("{}:{}", host, container));
        }
        Ok(self)
    }
}

pub(super) fn render(topology: &Topology<'_>, images: &ImagesConfig) -> Result<String, StackError> {
    let mut services = BTreeMap::new();

    services.insert(
        COLLECTOR_SERVICE,
        ComposeService::new(&images.collector, &format!("--config={}", COLLECTOR_CONFIG_PATH))
            .mount_config(COLLECTOR_CONFIG_FILE, COLLECTOR_CONFIG_PATH)
            .depends_on(&[LOKI_SERVICE, TEMPO_SERVICE])
            .publish(topology, COLLECTOR_SERVICE)?,
    );

    services.insert(
        PROMETHEUS_SERVICE,
        ComposeService::new(&images.prometheus, &format!("--config.file={}", PROMETHEUS_CONFIG_PATH))
            .mount_config(PROMETHEUS_CONFIG_FILE, PROMETHEUS_CONFIG_PATH)
            .depends_on(&[COLLECTOR_SERVICE])
            .publish(topology, PROMETHEUS_SERVICE)?,
    );

    services.insert(
        LOKI_SERVICE,
        ComposeService::new(&images.loki, "-config.file=/etc/loki/local-config.yaml")
            .publish(topology, LOKI_SERVICE)?,
    );

    let mut tempo = ComposeService::new(&images.tempo, &format!("-config.file={}", TEMPO_CONFIG_PATH))
        .mount_config(TEMPO_CONFIG_FILE, TEMPO_CONFIG_PATH)
        .publish(topology, TEMPO_SERVICE)?;
    tempo.volumes.push(format!("{}:{}", TEMPO_VOLUME, TEMPO_DATA_DIR));
    services.insert(TEMPO_SERVICE, tempo);

    let manifest = ComposeManifest {
        name: PROJECT_NAME,
        services,
        volumes: BTreeMap::from([(TEMPO_VOLUME, NamedVolume {})]),
    };

    to_yaml(&manifest)
}
