//! Stack lifecycle: start, stop and post-launch port reconciliation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use engine_runtime::ComposeEngine;
use stack_shared_types::{PortRole, ServiceSpec, StackError, StackState};
use state_store_interface::StateStore;

/// A role whose actual host port could not be learned from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationMiss {
    pub role: PortRole,
    pub service: &'static str,
    pub reason: String,
}

/// A role whose host port was read back from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortUpdate {
    pub role: PortRole,
    pub previous: Option<u16>,
    pub current: u16,
}

impl PortUpdate {
    pub fn drifted(&self) -> bool {
        self.previous != Some(self.current)
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: Vec<PortUpdate>,
    pub misses: Vec<ReconciliationMiss>,
}

impl ReconcileReport {
    /// Every engine-managed role answered.
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn drifted(&self) -> impl Iterator<Item = &PortUpdate> {
        self.updated.iter().filter(|u| u.drifted())
    }
}

/// Drives the orchestration engine for one manifest.
pub struct Lifecycle {
    engine: Arc<dyn ComposeEngine>,
    specs: Vec<ServiceSpec>,
    manifest: PathBuf,
}

impl Lifecycle {
    pub fn new(engine: Arc<dyn ComposeEngine>, specs: &[ServiceSpec], manifest: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            specs: specs.to_vec(),
            manifest: manifest.into(),
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Bring every service up, detached.
    ///
    /// A missing engine or a rejected manifest is fatal.
    #[instrument(skip(self), fields(manifest = ?self.manifest))]
    pub async fn start(&self) -> Result<(), StackError> {
        if !tokio::fs::try_exists(&self.manifest).await.unwrap_or(false) {
            return Err(StackError::MissingPersistedState {
                path: self.manifest.clone(),
            });
        }

        let version = self.engine.verify().await?;
        info!("Starting stack with engine {}", version);
        self.engine.up(&self.manifest).await?;
        info!("Stack started");
        Ok(())
    }

    #[instrument(skip(self), fields(manifest = ?self.manifest))]
    pub async fn stop(&self) -> Result<(), StackError> {
        self.engine.verify().await?;
        self.engine.down(&self.manifest).await?;
        info!("Stack stopped");
        Ok(())
    }

    /// Read the actual host port of every engine-managed role.
    ///
    /// Roles the engine answers for are overwritten; the rest keep their
    /// prior value and are reported as misses. Never fails.
    #[instrument(skip_all)]
    pub async fn reconcile(&self, state: &StackState) -> (StackState, ReconcileReport) {
        let mut next = state.clone();
        let mut report = ReconcileReport::default();

        for spec in &self.specs {
            let Some(container_port) = spec.container_port else {
                continue;
            };

            let reason = match self.engine.port(&self.manifest, spec.service, container_port).await {
                Ok(Some(port)) => {
                    let previous = next.port(spec.role);
                    next.set_port(spec.role, port);
                    report.updated.push(PortUpdate {
                        role: spec.role,
                        previous,
                        current: port,
                    });
                    continue;
                }
                Ok(None) => "engine reported no binding".to_string(),
                Err(e) => e.to_string(),
            };

            warn!(
                "Could not reconcile {} ({}:{}), keeping previous port: {}",
                spec.role, spec.service, container_port, reason
            );
            report.misses.push(ReconciliationMiss {
                role: spec.role,
                service: spec.service,
                reason,
            });
        }

        for update in report.drifted() {
            info!(
                "{} moved from {:?} to {}",
                update.role, update.previous, update.current
            );
        }

        (next, report)
    }

    /// Start the stack for the persisted state, reconcile and persist.
    ///
    /// Persisting is best-effort: the reconciled state is returned even when
    /// the write fails.
    pub async fn bring_up(&self, store: &dyn StateStore) -> Result<(StackState, ReconcileReport), StackError> {
        let state = store.load().await?;
        self.start().await?;

        let (reconciled, report) = self.reconcile(&state).await;
        if reconciled != state {
            if let Err(e) = store.save(&reconciled).await {
                warn!("Failed to persist reconciled state to {:?}: {}", store.location(), e);
            }
        }

        Ok((reconciled, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_runtime::{MockEngine, MockPort};
    use stack_shared_types::{default_services, PortAssignment};
    use state_store_interface::InMemoryStore;

    fn prior_state() -> StackState {
        let assignment: PortAssignment = PortRole::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| (*role, 30000 + i as u16))
            .collect();
        StackState::from_assignment(&assignment, "token").unwrap()
    }

    async fn engine_with_all_ports(base: u16) -> MockEngine {
        let engine = MockEngine::new();
        for (i, spec) in default_services().iter().enumerate() {
            if let Some(container) = spec.container_port {
                engine
                    .set_port(spec.service, container, MockPort::Bound(base + i as u16))
                    .await;
            }
        }
        engine
    }

    fn lifecycle(engine: MockEngine, manifest: impl Into<PathBuf>) -> Lifecycle {
        Lifecycle::new(Arc::new(engine), default_services(), manifest)
    }

    #[tokio::test]
    async fn test_reconcile_keeps_stale_port_on_single_failure() {
        let engine = engine_with_all_ports(49000).await;
        engine
            .set_port("loki", 3100, MockPort::Fail("no such container".into()))
            .await;
        let prior = prior_state();

        let (state, report) = lifecycle(engine, "compose.yml").reconcile(&prior).await;

        assert_eq!(state.ports.loki, prior.ports.loki);
        assert_eq!(report.misses.len(), 1);
        assert_eq!(report.misses[0].role, PortRole::Loki);
        assert!(report.misses[0].reason.contains("no such container"));

        assert_eq!(state.ports.prometheus, 49003);
        assert_eq!(state.ports.tempo_http, 49005);
        assert_eq!(state.ports.tempo_grpc, 49006);
        assert_eq!(state.ports.prometheus_exporter, 49002);
        assert_eq!(state.collector.endpoint_http, "http://localhost:49000/v1/traces");
        assert_eq!(state.collector.endpoint_grpc, "http://localhost:49001");
        assert_eq!(report.updated.len(), 6);
    }

    #[tokio::test]
    async fn test_reconcile_never_touches_dashboard() {
        let engine = engine_with_all_ports(49000).await;
        let prior = prior_state();

        let (state, report) = lifecycle(engine.clone(), "compose.yml").reconcile(&prior).await;

        assert_eq!(state.ports.dashboard, prior.ports.dashboard);
        assert!(report.is_complete());
        assert!(!engine.calls().await.iter().any(|c| c.contains("dashboard")));
    }

    #[tokio::test]
    async fn test_reconcile_total_miss_returns_prior_state() {
        let engine = MockEngine::unavailable();
        let prior = prior_state();

        let (state, report) = lifecycle(engine, "compose.yml").reconcile(&prior).await;

        assert_eq!(state, prior);
        assert_eq!(report.misses.len(), 7);
        assert!(report.updated.is_empty());
    }

    #[tokio::test]
    async fn test_unbound_port_is_a_miss() {
        let engine = MockEngine::new();
        let prior = prior_state();

        let (state, report) = lifecycle(engine, "compose.yml").reconcile(&prior).await;

        assert_eq!(state, prior);
        assert!(report.misses.iter().all(|m| m.reason.contains("no binding")));
    }

    #[tokio::test]
    async fn test_start_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = lifecycle(MockEngine::new(), dir.path().join("docker-compose.yml"))
            .start()
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::MissingPersistedState { .. }));
    }

    #[tokio::test]
    async fn test_start_fails_when_engine_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("docker-compose.yml");
        tokio::fs::write(&manifest, "services: {}\n").await.unwrap();

        let err = lifecycle(MockEngine::unavailable(), manifest).start().await.unwrap_err();
        assert!(matches!(err, StackError::EngineUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_start_fails_on_rejected_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("docker-compose.yml");
        tokio::fs::write(&manifest, "not: [valid\n").await.unwrap();
        let engine = MockEngine::new();
        engine.fail_up("yaml: line 1: did not find expected node content").await;

        let err = lifecycle(engine, manifest).start().await.unwrap_err();
        assert!(err.to_string().contains("did not find expected"));
    }

    #[tokio::test]
    async fn test_bring_up_persists_reconciled_state() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("docker-compose.yml");
        tokio::fs::write(&manifest, "services: {}\n").await.unwrap();

        let engine = engine_with_all_ports(49000).await;
        let store = InMemoryStore::with_state(prior_state());

        let (state, report) = lifecycle(engine.clone(), manifest)
            .bring_up(&store)
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(store.load().await.unwrap(), state);
        assert_eq!(store.save_count().await, 1);
        assert!(engine.running().await.is_some());
    }

    #[tokio::test]
    async fn test_bring_up_without_state_fails_before_engine() {
        let engine = MockEngine::new();
        let store = InMemoryStore::new();

        let err = lifecycle(engine.clone(), "compose.yml")
            .bring_up(&store)
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::MissingPersistedState { .. }));
        assert!(engine.calls().await.is_empty());
    }
}
