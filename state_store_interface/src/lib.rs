//! Repository interface for the persisted stack state.
//!
//! Callers hold a `StateStore` and pass [`StackState`] values explicitly;
//! nothing reads the state directory behind their back.
//!
//! Backends:
//! - [`JsonFileStore`]: `config.json` + `agents.json` in a state directory (default)
//! - [`InMemoryStore`]: process-local, for tests (requires `in-memory` feature)
//!
//! The file backend takes no locks. Two provisioning runs against the same
//! directory race and the last writer wins.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use stack_shared_types::{AgentRegistration, StackError, StackState};

#[cfg(feature = "json-file")]
pub mod json_file;

#[cfg(feature = "in-memory")]
pub mod in_memory;

#[cfg(feature = "json-file")]
pub use json_file::JsonFileStore;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryStore;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("State not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StateStoreError>;

impl From<StateStoreError> for StackError {
    fn from(err: StateStoreError) -> Self {
        match err {
            StateStoreError::NotFound { path } => StackError::MissingPersistedState { path },
            StateStoreError::Io { path, source } => StackError::Io { path, source },
            other => StackError::InvalidState(other.to_string()),
        }
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stack state. Fails with `NotFound` before the first provisioning run.
    async fn load(&self) -> Result<StackState>;

    /// Replace the stack state wholesale.
    async fn save(&self, state: &StackState) -> Result<()>;

    /// Whether a state record exists.
    async fn exists(&self) -> Result<bool>;

    /// Where the state lives, for operator messages.
    fn location(&self) -> PathBuf;

    /// Registered agents. Empty when no agent has been linked yet.
    async fn list_agents(&self) -> Result<Vec<AgentRegistration>>;

    /// Insert a registration, replacing any entry with the same agent name.
    async fn upsert_agent(&self, registration: AgentRegistration) -> Result<()>;
}

/// Replace-by-name semantics shared by the backends.
pub(crate) fn upsert_by_name(agents: &mut Vec<AgentRegistration>, registration: AgentRegistration) {
    agents.retain(|a| a.agent_name != registration.agent_name);
    agents.push(registration);
}
