//! JSON file backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use stack_shared_types::{AgentRegistration, StackState};

use crate::{upsert_by_name, Result, StateStore, StateStoreError};

pub const STATE_FILE: &str = "config.json";
pub const AGENTS_FILE: &str = "agents.json";

/// Stores state as pretty-printed JSON files inside one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn agents_path(&self) -> PathBuf {
        self.dir.join(AGENTS_FILE)
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateStoreError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(StateStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StateStoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write through a sibling temp file so readers never see a torn document.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let io_err = |source| StateStoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;

        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        debug!("Wrote {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<StackState> {
        Self::read_json(&self.state_path()).await
    }

    async fn save(&self, state: &StackState) -> Result<()> {
        self.write_json(&self.state_path(), state).await
    }

    async fn exists(&self) -> Result<bool> {
        let path = self.state_path();
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StateStoreError::Io { path, source })
    }

    fn location(&self) -> PathBuf {
        self.state_path()
    }

    async fn list_agents(&self) -> Result<Vec<AgentRegistration>> {
        match Self::read_json(&self.agents_path()).await {
            Err(StateStoreError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn upsert_agent(&self, registration: AgentRegistration) -> Result<()> {
        let mut agents = self.list_agents().await?;
        upsert_by_name(&mut agents, registration);
        self.write_json(&self.agents_path(), &agents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_shared_types::{PortAssignment, PortRole};
    use uuid::Uuid;

    fn sample_state() -> StackState {
        let assignment: PortAssignment = PortRole::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| (*role, 40000 + i as u16))
            .collect();
        StackState::from_assignment(&assignment, "secret").unwrap()
    }

    fn registration(name: &str, role: &str) -> AgentRegistration {
        AgentRegistration {
            agent_id: Uuid::new_v4(),
            agent_name: name.to_string(),
            role: role.to_string(),
            connected_agents: vec![],
            methods: vec![],
        }
    }

    #[tokio::test]
    async fn test_load_before_save_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(!store.exists().await.unwrap());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StateStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let state = sample_state();

        store.save(&state).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let mut state = sample_state();
        store.save(&state).await.unwrap();

        state.set_port(PortRole::Loki, 41234);
        state.collector.token = "rotated".to_string();
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.ports.loki, 41234);
        assert_eq!(loaded.collector.token, "rotated");
    }

    #[tokio::test]
    async fn test_corrupt_state_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        tokio::fs::write(store.state_path(), br#"{"collector": {}}"#)
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StateStoreError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_upsert_agent_replaces_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.list_agents().await.unwrap().is_empty());

        store.upsert_agent(registration("planner", "Agent")).await.unwrap();
        store.upsert_agent(registration("executor", "Agent")).await.unwrap();
        store.upsert_agent(registration("planner", "Lead")).await.unwrap();

        let agents = store.list_agents().await.unwrap();
        assert_eq!(agents.len(), 2);
        let planner = agents.iter().find(|a| a.agent_name == "planner").unwrap();
        assert_eq!(planner.role, "Lead");
    }
}
