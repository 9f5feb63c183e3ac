//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

use stack_config::ConfigError;
use stack_shared_types::StackError;
use state_store_interface::StateStoreError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No agent config at {path:?}. Run `a2a link` first")]
    NotLinked { path: PathBuf },

    #[error("Invalid agent config at {path:?}: {message}")]
    InvalidAgentConfig { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dashboard server failed: {0}")]
    Server(String),
}

impl From<StateStoreError> for CliError {
    fn from(err: StateStoreError) -> Self {
        CliError::Stack(err.into())
    }
}

impl CliError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CliError::InvalidArgument(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Stack(StackError::io(path, source))
    }
}
