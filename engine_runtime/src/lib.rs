//! Orchestration engine drivers.
//!
//! This crate provides implementations of the `ComposeEngine` trait:
//! - `DockerComposeCli`: drives the `docker compose` CLI as a child process
//! - `MockEngine`: scripted in-memory engine for testing (default feature `mock-engine`)

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use stack_shared_types::StackError;

pub mod compose_cli;

#[cfg(feature = "mock-engine")]
pub mod mock;

pub use compose_cli::{parse_port_output, ComposeCliConfig, DockerComposeCli};

#[cfg(feature = "mock-engine")]
pub use mock::{MockEngine, MockPort};

/// Errors from engine invocations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Engine command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unexpected engine output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for StackError {
    fn from(err: EngineError) -> Self {
        StackError::EngineUnavailable {
            reason: err.to_string(),
        }
    }
}

/// A container orchestration engine that runs a multi-service manifest.
#[async_trait]
pub trait ComposeEngine: Send + Sync {
    /// Check the engine is installed and answering. Returns its version string.
    async fn verify(&self) -> Result<String>;

    /// Bring every service of the manifest up, detached.
    async fn up(&self, manifest: &Path) -> Result<()>;

    /// Stop and remove every service of the manifest.
    async fn down(&self, manifest: &Path) -> Result<()>;

    /// Host port currently bound to `service`'s `container_port`.
    ///
    /// `Ok(None)` means the engine answered but reported no binding.
    async fn port(&self, manifest: &Path, service: &str, container_port: u16) -> Result<Option<u16>>;
}
