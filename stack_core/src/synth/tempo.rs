//! Tempo configuration: fixed listen ports and local storage.

use serde::Serialize;

use stack_shared_types::{PortRole, StackError};

use super::{to_yaml, Topology};

/// Mount point of the trace volume inside the tempo container.
pub(super) const TEMPO_DATA_DIR: &str = "/var/tempo";

#[derive(Serialize)]
struct TempoConfig {
    server: Server,
    distributor: Distributor,
    storage: Storage,
}

#[derive(Serialize)]
struct Server {
    http_listen_port: u16,
}

#[derive(Serialize)]
struct Distributor {
    receivers: Receivers,
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
    grpc: Endpoint,
}

#[derive(Serialize)]
struct Endpoint {
    endpoint: String,
}

#[derive(Serialize)]
struct Storage {
    trace: TraceStorage,
}

#[derive(Serialize)]
struct TraceStorage {
    backend: &'static str,
    local: LocalPath,
    wal: LocalPath,
}

#[derive(Serialize)]
struct LocalPath {
    path: String,
}

pub(super) fn render(topology: &Topology<'_>) -> Result<String, StackError> {
    let config = TempoConfig {
        server: Server {
            http_listen_port: topology.container_port(PortRole::TempoHttp)?,
        },
        distributor: Distributor {
            receivers: Receivers {
                otlp: OtlpReceiver {
                    protocols: OtlpProtocols {
                        grpc: Endpoint {
                            endpoint: topology.listen_address(PortRole::TempoGrpc)?,
                        },
                    },
                },
            },
        },
        storage: Storage {
            trace: TraceStorage {
                backend: "local",
                local: LocalPath {
                    path: format!("{}/traces", TEMPO_DATA_DIR),
                },
                wal: LocalPath {
                    path: format!("{}/wal", TEMPO_DATA_DIR),
                },
            },
        },
    };

    to_yaml(&config)
}
