//! Start-dashboard command - bring the stack up and serve the dashboard.

use std::sync::Arc;

use query_proxy::ProxyState;
use state_store_interface::StateStore;

use crate::commands::status::print_endpoints;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{self, section};

/// Execute the start-dashboard command. Runs until Ctrl-C.
pub async fn execute(ctx: &Context) -> anyhow::Result<()> {
    output::info("Starting telemetry stack...");
    let (state, report) = ctx
        .lifecycle()
        .bring_up(ctx.store.as_ref())
        .await
        .map_err(CliError::from)?;

    output::success("Telemetry stack running");
    for miss in &report.misses {
        output::warn(&format!(
            "Could not confirm the {} port of {} ({}); using {:?}",
            miss.role,
            miss.service,
            miss.reason,
            state.port(miss.role)
        ));
    }
    for update in report.drifted() {
        output::info(&format!(
            "{} is bound to {} (was {:?})",
            update.role, update.current, update.previous
        ));
    }

    section("Endpoints");
    print_endpoints(&state);

    let metrics = match observability::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            output::warn(&format!("Metrics disabled: {}", e));
            None
        }
    };

    let store: Arc<dyn StateStore> = ctx.store.clone();
    let dashboard_port = state.ports.dashboard;
    let mut proxy_state = ProxyState::new(state, store, ctx.config.proxy.upstream_timeout())
        .map_err(|e| CliError::Server(e.to_string()))?;
    if let Some(handle) = metrics {
        proxy_state = proxy_state.with_metrics(handle);
    }

    let static_dir = ctx.config.dashboard.static_dir.as_deref();
    if static_dir.is_none() {
        output::warn("No dashboard build configured; serving the API only (set A2A_DASHBOARD_DIR)");
    }
    let app = query_proxy::app(proxy_state, static_dir);

    let listener = query_proxy::bind(dashboard_port)
        .await
        .map_err(|e| CliError::Server(format!("cannot bind port {}: {}", dashboard_port, e)))?;
    output::success(&format!("Dashboard running at http://localhost:{}", dashboard_port));
    output::info("Press Ctrl-C to stop the dashboard; `a2a stop` stops the stack");

    query_proxy::serve(listener, app, shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))?;

    output::info("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
