//! In-memory backend.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stack_shared_types::{AgentRegistration, StackState};

use crate::{upsert_by_name, Result, StateStore, StateStoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<Option<StackState>>>,
    agents: Arc<RwLock<Vec<AgentRegistration>>>,
    saves: Arc<RwLock<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StackState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Some(state))),
            ..Self::default()
        }
    }

    /// Number of `save` calls so far.
    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn load(&self) -> Result<StackState> {
        self.state
            .read()
            .await
            .clone()
            .ok_or_else(|| StateStoreError::NotFound { path: self.location() })
    }

    async fn save(&self, state: &StackState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state.read().await.is_some())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("memory://stack-state")
    }

    async fn list_agents(&self) -> Result<Vec<AgentRegistration>> {
        Ok(self.agents.read().await.clone())
    }

    async fn upsert_agent(&self, registration: AgentRegistration) -> Result<()> {
        upsert_by_name(&mut *self.agents.write().await, registration);
        Ok(())
    }
}
