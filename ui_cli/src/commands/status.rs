//! Status command - show the persisted ports, endpoints and agents.

use serde::Serialize;
use tabled::Tabled;

use stack_shared_types::{default_services, AgentRegistration, ServiceSpec, StackState};
use state_store_interface::StateStore;

use crate::context::Context;
use crate::output::{self, print_data, print_item, section};
use crate::OutputFormat;

/// One row of the port table.
#[derive(Debug, Serialize, Tabled)]
pub struct PortRow {
    #[tabled(rename = "Service")]
    pub service: &'static str,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Host Port")]
    pub host_port: String,
    #[tabled(rename = "Container Port")]
    pub container_port: String,
    #[tabled(rename = "Protocol")]
    pub protocol: String,
}

#[derive(Debug, Serialize, Tabled)]
struct AgentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Connects To")]
    connects_to: String,
    #[tabled(rename = "Methods")]
    methods: String,
}

impl From<AgentRegistration> for AgentRow {
    fn from(reg: AgentRegistration) -> Self {
        Self {
            name: reg.agent_name,
            role: reg.role,
            connects_to: join_or_dash(&reg.connected_agents),
            methods: join_or_dash(&reg.methods),
        }
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

pub fn port_rows(specs: &[ServiceSpec], state: &StackState) -> Vec<PortRow> {
    specs
        .iter()
        .map(|spec| PortRow {
            service: spec.service,
            role: spec.role.to_string(),
            host_port: state
                .port(spec.role)
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string()),
            container_port: spec
                .container_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "host".to_string()),
            protocol: spec.protocol.to_string(),
        })
        .collect()
}

/// Print the backend URLs of a state.
pub fn print_endpoints(state: &StackState) {
    output::field("Collector HTTP", &state.collector.endpoint_http);
    output::field("Collector gRPC", &state.collector.endpoint_grpc);
    output::field("Prometheus", &state.prometheus_url());
    output::field("Loki", &state.loki_url());
    output::field("Tempo", &state.tempo_url());
    output::field("Dashboard", &format!("http://localhost:{}", state.ports.dashboard));
}

pub async fn execute(ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    let state = ctx.load_state().await?;
    let agents = ctx.store.list_agents().await.map_err(crate::error::CliError::from)?;

    if !matches!(format, OutputFormat::Table) {
        #[derive(Serialize)]
        struct StatusOutput<'a> {
            state: &'a StackState,
            agents: &'a [AgentRegistration],
        }
        return print_item(&StatusOutput { state: &state, agents: &agents }, format);
    }

    section("Stack");
    output::field("State", &ctx.store.location().display().to_string());
    print_endpoints(&state);

    section("Ports");
    print_data(&port_rows(default_services(), &state), format)?;

    section("Agents");
    let rows: Vec<AgentRow> = agents.into_iter().map(Into::into).collect();
    print_data(&rows, format)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_shared_types::{PortAssignment, PortRole};

    #[test]
    fn test_port_rows_follow_service_order() {
        let assignment: PortAssignment = default_services()
            .iter()
            .map(|s| (s.role, s.preferred_host_port))
            .collect();
        let state = StackState::from_assignment(&assignment, "t").unwrap();

        let rows = port_rows(default_services(), &state);

        assert_eq!(rows.len(), default_services().len());
        assert_eq!(rows[0].service, "otel-collector");
        assert_eq!(rows[0].host_port, "4318");
        assert_eq!(rows[0].protocol, "http");
        assert_eq!(rows[1].protocol, "grpc");
        let dashboard = rows.iter().find(|r| r.role == PortRole::Dashboard.to_string()).unwrap();
        assert_eq!(dashboard.container_port, "host");
        assert_eq!(dashboard.host_port, "4000");
    }
}
