//! One provisioning run: allocate ports, render documents, persist state.

use std::path::PathBuf;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use stack_config::{StackConfig, StackPaths};
use stack_shared_types::{PortAssignment, ServiceSpec, StackError, StackState};
use state_store_interface::StateStore;

use crate::ports::{PortAllocator, PortCheck};
use crate::synth::{synthesize, DocumentKind, StackDocuments};

/// What to do when a provisioned stack already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the documents and the state wholesale.
    Force,
    /// Fail with `AlreadyProvisioned` and write nothing.
    #[default]
    RefuseExisting,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub state: StackState,
    pub assignment: PortAssignment,
    pub written: Vec<PathBuf>,
}

/// Provision the stack into `paths.root`.
///
/// Documents are written before the state record, so a state file on disk
/// always has its documents next to it. Allocation or rendering failures
/// write nothing.
#[instrument(skip_all, fields(root = ?paths.root, mode = ?mode))]
pub async fn provision<P: PortCheck>(
    store: &dyn StateStore,
    paths: &StackPaths,
    config: &StackConfig,
    specs: &[ServiceSpec],
    check: P,
    mode: WriteMode,
) -> Result<ProvisionOutcome, StackError> {
    if mode == WriteMode::RefuseExisting && store.exists().await? {
        return Err(StackError::AlreadyProvisioned {
            path: store.location(),
        });
    }

    let mut allocator = PortAllocator::new(check, config.ports.scan_window);
    let assignment = allocator.allocate_all(specs)?;
    let documents = synthesize(specs, &assignment, &config.images)?;
    let state = StackState::from_assignment(&assignment, Uuid::new_v4().to_string())?;

    tokio::fs::create_dir_all(&paths.root)
        .await
        .map_err(|e| StackError::io(&paths.root, e))?;

    let written = write_documents(paths, &documents).await?;

    store.save(&state).await?;
    info!("Provisioned stack, state at {:?}", store.location());

    Ok(ProvisionOutcome {
        state,
        assignment,
        written,
    })
}

/// Stage every document as `<name>.tmp`, then rename them into place.
///
/// A failed write removes the staged files and leaves the previous
/// documents untouched.
async fn write_documents(paths: &StackPaths, documents: &StackDocuments) -> Result<Vec<PathBuf>, StackError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(DocumentKind::ALL.len());
    for (kind, content) in documents.iter() {
        let path = paths.document(kind.file_name());
        let tmp = paths.document(&format!("{}.tmp", kind.file_name()));
        if let Err(e) = tokio::fs::write(&tmp, content).await {
            for (_, leftover) in &staged {
                let _ = tokio::fs::remove_file(leftover).await;
            }
            return Err(StackError::io(&tmp, e));
        }
        staged.push((path, tmp));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (path, tmp) in staged {
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StackError::io(&path, e))?;
        debug!("Wrote {:?}", path);
        written.push(path);
    }
    Ok(written)
}
