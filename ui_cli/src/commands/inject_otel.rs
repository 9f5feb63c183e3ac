//! Inject-otel command - write instrumentation snippets for a linked agent.

use std::path::{Path, PathBuf};

use stack_shared_types::AgentConfig;

use crate::commands::link::AGENT_CONFIG_FILE;
use crate::error::CliError;
use crate::output;

pub const README_FILE: &str = "a2a.README.md";

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Setup guide for one agent: where its telemetry goes and how to wire the
/// OpenTelemetry SDKs to read `.a2a.config.json`.
pub fn render_readme(config: &AgentConfig) -> String {
    format!(
        r#"# A2A telemetry for {name}

- Role: {role}
- Connected agents: {connected}
- Methods: {methods}

Settings live in `{config_file}`. Telemetry is sent to:

- Collector (OTLP/HTTP): `{endpoint}`
- Collector (OTLP/gRPC): `{grpc_endpoint}`
- Metrics (Prometheus exporter): `http://localhost:{metric_port}/metrics`

Every export must carry `Authorization: Bearer <token>` with the token from
`{config_file}`. Log records should set `a2a.to` to the name of the agent a
message is addressed to; the dashboard shows it as the agent's last peer.

## Node.js

```bash
npm install @opentelemetry/sdk-node @opentelemetry/exporter-trace-otlp-http @opentelemetry/resources
```

```js
import {{ readFileSync }} from "node:fs";
import {{ NodeSDK }} from "@opentelemetry/sdk-node";
import {{ OTLPTraceExporter }} from "@opentelemetry/exporter-trace-otlp-http";
import {{ Resource }} from "@opentelemetry/resources";

const config = JSON.parse(readFileSync("{config_file}", "utf8"));

const sdk = new NodeSDK({{
  resource: new Resource({{
    "service.name": config.agentName,
    "a2a.agent.id": config.agentId,
    "a2a.agent.role": config.role,
    "a2a.agent.connected": config.connectedAgents.join(","),
    "a2a.agent.methods": config.methods.join(","),
  }}),
  traceExporter: new OTLPTraceExporter({{
    url: config.endpoint,
    headers: {{ Authorization: `Bearer ${{config.token}}` }},
  }}),
}});
sdk.start();
```

## Python

```bash
pip install opentelemetry-sdk opentelemetry-exporter-otlp
```

```python
import json

from opentelemetry import trace
from opentelemetry.exporter.otlp.proto.http.trace_exporter import OTLPSpanExporter
from opentelemetry.sdk.resources import Resource
from opentelemetry.sdk.trace import TracerProvider
from opentelemetry.sdk.trace.export import BatchSpanProcessor

with open("{config_file}") as f:
    config = json.load(f)

resource = Resource.create({{
    "service.name": config["agentName"],
    "a2a.agent.id": config["agentId"],
    "a2a.agent.role": config.get("role", ""),
    "a2a.agent.connected": ",".join(config.get("connectedAgents", [])),
    "a2a.agent.methods": ",".join(config.get("methods", [])),
}})

exporter = OTLPSpanExporter(
    endpoint=config["endpoint"],
    headers={{"Authorization": f"Bearer {{config['token']}}"}},
)

provider = TracerProvider(resource=resource)
provider.add_span_processor(BatchSpanProcessor(exporter))
trace.set_tracer_provider(provider)
```
"#,
        name = config.agent_name,
        role = config.role,
        connected = join_or_none(&config.connected_agents),
        methods = join_or_none(&config.methods),
        config_file = AGENT_CONFIG_FILE,
        endpoint = config.endpoint,
        grpc_endpoint = config.grpc_endpoint,
        metric_port = config.metric_port,
    )
}

/// Read the agent config in `project_dir` and write the guide next to it.
pub async fn inject(project_dir: &Path) -> Result<PathBuf, CliError> {
    let config_path = project_dir.join(AGENT_CONFIG_FILE);
    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CliError::NotLinked { path: config_path });
        }
        Err(e) => return Err(CliError::io(&config_path, e)),
    };
    let config: AgentConfig = serde_json::from_str(&content).map_err(|e| CliError::InvalidAgentConfig {
        path: config_path.clone(),
        message: e.to_string(),
    })?;

    let readme_path = project_dir.join(README_FILE);
    tokio::fs::write(&readme_path, render_readme(&config))
        .await
        .map_err(|e| CliError::io(&readme_path, e))?;
    Ok(readme_path)
}

/// Execute the inject-otel command.
pub async fn execute() -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let path = inject(&cwd).await?;

    output::success("OpenTelemetry setup written");
    output::field("File", &path.display().to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn agent_config() -> AgentConfig {
        AgentConfig {
            agent_id: Uuid::new_v4(),
            agent_name: "planner".into(),
            role: "Planner".into(),
            connected_agents: vec!["critic".into(), "executor".into()],
            methods: vec![],
            endpoint: "http://localhost:4319/v1/traces".into(),
            grpc_endpoint: "http://localhost:55680".into(),
            token: "tok".into(),
            metric_port: 9464,
        }
    }

    #[test]
    fn test_readme_mentions_endpoints() {
        let readme = render_readme(&agent_config());

        assert!(readme.starts_with("# A2A telemetry for planner"));
        assert!(readme.contains("`http://localhost:4319/v1/traces`"));
        assert!(readme.contains("`http://localhost:55680`"));
        assert!(readme.contains("http://localhost:9464/metrics"));
        assert!(readme.contains("Connected agents: critic, executor"));
        assert!(readme.contains("Methods: None"));
    }

    #[tokio::test]
    async fn test_inject_writes_readme() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(AGENT_CONFIG_FILE),
            serde_json::to_string(&agent_config()).unwrap(),
        )
        .unwrap();

        let path = inject(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join(README_FILE));
        assert!(std::fs::read_to_string(path).unwrap().contains("planner"));
    }

    #[tokio::test]
    async fn test_inject_requires_link() {
        let dir = tempfile::tempdir().unwrap();
        let err = inject(dir.path()).await.unwrap_err();

        assert!(matches!(err, CliError::NotLinked { .. }));
        assert!(!dir.path().join(README_FILE).exists());
    }
}
