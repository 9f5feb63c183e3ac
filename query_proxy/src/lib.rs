//! Dashboard-facing HTTP proxy in front of the Loki query API.
//!
//! Routes:
//! - `GET /api/config`: backend URLs and registered agents
//! - `GET /api/logs/labels/:name/values`
//! - `GET /api/logs/series?start&end&match`
//! - `GET /api/logs/query?query&time`
//! - `GET /api/logs/query_range?query&start&end&limit&direction`
//! - `GET /api/agents/:name/activity?lookback&limit`
//! - `GET /healthz`, `GET /metrics`
//!
//! Times at this boundary are milliseconds since epoch. Every upstream
//! failure is answered with `{"error": {"kind", "message"}}`.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod activity;
pub mod error;
pub mod handlers;
pub mod loki;
pub mod state;
pub mod time;

pub use activity::AgentActivity;
pub use error::{ProxyError, ProxyErrorKind, ProxyResult};
pub use loki::{Direction, LogLine, LokiClient, RangeQuery};
pub use state::ProxyState;
pub use time::TimeWindow;

/// API routes only.
pub fn api_router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/config", get(handlers::get_config))
        .route("/api/logs/labels/:name/values", get(handlers::label_values))
        .route("/api/logs/series", get(handlers::series))
        .route("/api/logs/query", get(handlers::query))
        .route("/api/logs/query_range", get(handlers::query_range))
        .route("/api/agents/:name/activity", get(handlers::agent_activity))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// API routes plus the dashboard build, if any.
///
/// Unknown paths fall back to `index.html` so the dashboard's client-side
/// routes resolve.
pub fn app(state: ProxyState, static_dir: Option<&Path>) -> Router {
    let mut router = api_router(state);
    if let Some(dir) = static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }
    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the dashboard port on loopback.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await
}

/// Serve `app` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Dashboard proxy listening on http://{}", addr);
    }
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
