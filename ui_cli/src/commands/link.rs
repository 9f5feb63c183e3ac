//! Link command - register the current project as an agent.

use std::path::{Path, PathBuf};

use clap::Args;
use uuid::Uuid;

use stack_shared_types::{AgentConfig, AgentRegistration};
use state_store_interface::StateStore;

use crate::context::Context;
use crate::error::CliError;
use crate::output;

/// Per-project agent config, read by instrumented agents.
pub const AGENT_CONFIG_FILE: &str = ".a2a.config.json";

const DEFAULT_ROLE: &str = "Agent";

/// Arguments for the link command.
#[derive(Args)]
pub struct LinkArgs {
    /// Agent name (default: name of the current directory)
    #[arg(short, long)]
    name: Option<String>,

    /// Agent role
    #[arg(short, long, default_value = DEFAULT_ROLE)]
    role: String,

    /// Agents this one talks to (comma separated, e.g. planner,executor)
    #[arg(long = "connects-to", value_delimiter = ',')]
    connects_to: Vec<String>,

    /// Methods or capabilities this agent provides (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    methods: Vec<String>,
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl LinkArgs {
    fn into_registration(self, project_dir: &Path) -> Result<AgentRegistration, CliError> {
        let agent_name = match self.name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            Some(_) => return Err(CliError::invalid_argument("agent name cannot be empty")),
            None => project_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CliError::invalid_argument("cannot derive an agent name here; pass --name"))?,
        };
        let role = match self.role.trim() {
            "" => DEFAULT_ROLE.to_string(),
            role => role.to_string(),
        };

        Ok(AgentRegistration {
            agent_id: Uuid::new_v4(),
            agent_name,
            role,
            connected_agents: clean_list(self.connects_to),
            methods: clean_list(self.methods),
        })
    }
}

/// Write the agent config into `project_dir` and upsert the registry entry.
pub async fn link_agent(
    store: &dyn StateStore,
    project_dir: &Path,
    registration: AgentRegistration,
) -> Result<(AgentConfig, PathBuf), CliError> {
    let state = store.load().await?;
    let config = AgentConfig::for_stack(&registration, &state);

    let path = project_dir.join(AGENT_CONFIG_FILE);
    let mut content = serde_json::to_string_pretty(&config).map_err(|e| CliError::InvalidAgentConfig {
        path: path.clone(),
        message: e.to_string(),
    })?;
    content.push('\n');
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| CliError::io(&path, e))?;

    store.upsert_agent(registration).await?;
    Ok((config, path))
}

/// Execute the link command.
pub async fn execute(args: LinkArgs, ctx: &Context) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let registration = args.into_registration(&cwd)?;

    let (config, path) = link_agent(ctx.store.as_ref(), &cwd, registration).await?;

    output::success(&format!("Linked agent \"{}\"", config.agent_name));
    output::field("Agent config", &path.display().to_string());
    output::field("Registry", &ctx.paths.root.join("agents.json").display().to_string());
    output::field("Collector", &config.endpoint);
    output::info("Next: run `a2a inject-otel` for instrumentation snippets");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_shared_types::{PortAssignment, PortRole, StackState};
    use state_store_interface::InMemoryStore;

    fn provisioned_store() -> InMemoryStore {
        let assignment: PortAssignment = PortRole::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| (*role, 41000 + i as u16))
            .collect();
        InMemoryStore::with_state(StackState::from_assignment(&assignment, "tok").unwrap())
    }

    fn args(name: Option<&str>) -> LinkArgs {
        LinkArgs {
            name: name.map(String::from),
            role: DEFAULT_ROLE.to_string(),
            connects_to: vec!["critic".into(), " ".into(), " executor".into()],
            methods: vec![],
        }
    }

    #[tokio::test]
    async fn test_link_writes_agent_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = provisioned_store();
        let state = store.load().await.unwrap();

        let registration = args(Some("planner")).into_registration(dir.path()).unwrap();
        let (config, path) = link_agent(&store, dir.path(), registration).await.unwrap();

        let written: AgentConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
        assert_eq!(written.endpoint, state.collector.endpoint_http);
        assert_eq!(written.grpc_endpoint, state.collector.endpoint_grpc);
        assert_eq!(written.token, "tok");
        assert_eq!(written.metric_port, state.ports.prometheus_exporter);
        assert_eq!(written.connected_agents, vec!["critic", "executor"]);
        assert_eq!(written.role, "Agent");
    }

    #[tokio::test]
    async fn test_relink_replaces_registry_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = provisioned_store();

        for _ in 0..2 {
            let registration = args(Some("planner")).into_registration(dir.path()).unwrap();
            link_agent(&store, dir.path(), registration).await.unwrap();
        }
        let registration = args(Some("critic")).into_registration(dir.path()).unwrap();
        link_agent(&store, dir.path(), registration).await.unwrap();

        let agents = store.list_agents().await.unwrap();
        let names: Vec<_> = agents.iter().map(|a| a.agent_name.as_str()).collect();
        assert_eq!(names, vec!["planner", "critic"]);
    }

    #[tokio::test]
    async fn test_link_requires_provisioned_stack() {
        let dir = tempfile::tempdir().unwrap();
        let registration = args(Some("planner")).into_registration(dir.path()).unwrap();

        let err = link_agent(&InMemoryStore::new(), dir.path(), registration)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("a2a init"));
        assert!(!dir.path().join(AGENT_CONFIG_FILE).exists());
    }

    #[test]
    fn test_name_defaults_to_directory() {
        let registration = args(None).into_registration(Path::new("/work/research-bot")).unwrap();
        assert_eq!(registration.agent_name, "research-bot");
    }
}
