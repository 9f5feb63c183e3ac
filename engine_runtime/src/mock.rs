//! Scripted in-memory engine for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{ComposeEngine, EngineError, Result};

/// Scripted answer to a `port` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPort {
    Bound(u16),
    Unbound,
    Fail(String),
}

#[derive(Debug, Default)]
struct MockInner {
    available: bool,
    up_error: Option<String>,
    ports: HashMap<(String, u16), MockPort>,
    running: Option<PathBuf>,
    calls: Vec<String>,
}

/// Engine double. Unscripted port queries answer `Unbound`.
#[derive(Debug, Clone)]
pub struct MockEngine {
    inner: Arc<RwLock<MockInner>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockInner {
                available: true,
                ..MockInner::default()
            })),
        }
    }

    /// An engine whose binary is missing.
    pub fn unavailable() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockInner::default())),
        }
    }

    /// Make `up` fail as if the manifest were rejected.
    pub async fn fail_up(&self, message: impl Into<String>) {
        self.inner.write().await.up_error = Some(message.into());
    }

    pub async fn set_port(&self, service: &str, container_port: u16, answer: MockPort) {
        self.inner
            .write()
            .await
            .ports
            .insert((service.to_string(), container_port), answer);
    }

    /// Manifest of the currently running stack, if any.
    pub async fn running(&self) -> Option<PathBuf> {
        self.inner.read().await.running.clone()
    }

    /// Commands received so far, e.g. `up`, `port loki 3100`.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.read().await.calls.clone()
    }

    async fn record(&self, call: String) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.calls.push(call);
        if !inner.available {
            return Err(EngineError::BinaryNotFound("mock engine unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComposeEngine for MockEngine {
    async fn verify(&self) -> Result<String> {
        self.record("version".to_string()).await?;
        Ok("mock".to_string())
    }

    async fn up(&self, manifest: &Path) -> Result<()> {
        self.record("up".to_string()).await?;
        let mut inner = self.inner.write().await;
        if let Some(message) = inner.up_error.clone() {
            return Err(EngineError::CommandFailed {
                command: "up -d".to_string(),
                message,
            });
        }
        debug!("Mock: stack {:?} up", manifest);
        inner.running = Some(manifest.to_path_buf());
        Ok(())
    }

    async fn down(&self, manifest: &Path) -> Result<()> {
        self.record("down".to_string()).await?;
        debug!("Mock: stack {:?} down", manifest);
        self.inner.write().await.running = None;
        Ok(())
    }

    async fn port(&self, _manifest: &Path, service: &str, container_port: u16) -> Result<Option<u16>> {
        self.record(format!("port {} {}", service, container_port)).await?;
        let answer = self
            .inner
            .read()
            .await
            .ports
            .get(&(service.to_string(), container_port))
            .cloned()
            .unwrap_or(MockPort::Unbound);

        match answer {
            MockPort::Bound(port) => Ok(Some(port)),
            MockPort::Unbound => Ok(None),
            MockPort::Fail(message) => Err(EngineError::CommandFailed {
                command: format!("port {} {}", service, container_port),
                message,
            }),
        }
    }
}
