//! Agent registration records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::StackState;

/// Entry of the global agent registry (`agents.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistration {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub role: String,
    #[serde(default)]
    pub connected_agents: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Per-project agent config (`.a2a.config.json`) read by instrumented agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub role: String,
    #[serde(default)]
    pub connected_agents: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    pub endpoint: String,
    pub grpc_endpoint: String,
    pub token: String,
    pub metric_port: u16,
}

impl AgentConfig {
    /// Bind a registration to the current collector endpoints.
    pub fn for_stack(registration: &AgentRegistration, state: &StackState) -> Self {
        Self {
            agent_id: registration.agent_id,
            agent_name: registration.agent_name.clone(),
            role: registration.role.clone(),
            connected_agents: registration.connected_agents.clone(),
            methods: registration.methods.clone(),
            endpoint: state.collector.endpoint_http.clone(),
            grpc_endpoint: state.collector.endpoint_grpc.clone(),
            token: state.collector.token.clone(),
            metric_port: state.ports.prometheus_exporter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_defaults_lists() {
        let json = r#"{
            "agentId": "6f1c2b7e-8d55-4c52-9b4e-0a3e4f1a2b3c",
            "agentName": "planner",
            "role": "Agent"
        }"#;
        let reg: AgentRegistration = serde_json::from_str(json).unwrap();
        assert_eq!(reg.agent_name, "planner");
        assert!(reg.connected_agents.is_empty());
        assert!(reg.methods.is_empty());
    }
}
