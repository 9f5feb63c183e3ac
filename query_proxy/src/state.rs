//! Proxy server state.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use observability::PrometheusHandle;
use stack_shared_types::StackState;
use state_store_interface::StateStore;

use crate::error::{ProxyError, ProxyResult};
use crate::loki::LokiClient;

/// Shared state for the proxy handlers.
#[derive(Clone)]
pub struct ProxyState {
    /// Reconciled stack state the proxy was started with.
    pub stack: Arc<StackState>,
    /// Store for the agent registry, read per request.
    pub store: Arc<dyn StateStore>,
    pub loki: LokiClient,
    /// Renders `/metrics`. `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl ProxyState {
    /// Point the Loki client at the stack's log store.
    pub fn new(stack: StackState, store: Arc<dyn StateStore>, upstream_timeout: Duration) -> ProxyResult<Self> {
        let base = Url::parse(&stack.loki_url())
            .map_err(|e| ProxyError::internal(format!("invalid log store URL: {}", e)))?;
        Ok(Self::with_loki(stack, store, LokiClient::new(base, upstream_timeout)?))
    }

    pub fn with_loki(stack: StackState, store: Arc<dyn StateStore>, loki: LokiClient) -> Self {
        Self {
            stack: Arc::new(stack),
            store,
            loki,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
