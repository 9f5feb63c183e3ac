use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for stack operations.
pub type Result<T> = std::result::Result<T, StackError>;

/// Fatal errors of the provisioning and lifecycle commands.
///
/// Non-fatal outcomes (a single reconciliation miss, a failed proxied query)
/// are not represented here; they degrade the result instead of aborting.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("No free port found in {start}..={end}")]
    PortExhausted { start: u16, end: u16 },

    #[error("Orchestration engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("No stack state at {path:?}. Run `a2a init` first")]
    MissingPersistedState { path: PathBuf },

    #[error("Stack already provisioned at {path:?}. Re-run with --force to regenerate")]
    AlreadyProvisioned { path: PathBuf },

    #[error("Invalid stack state: {0}")]
    InvalidState(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StackError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StackError::Io {
            path: path.into(),
            source,
        }
    }
}
