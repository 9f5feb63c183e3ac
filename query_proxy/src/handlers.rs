//! Request handlers.

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use stack_shared_types::AgentRegistration;

use crate::activity::{AgentActivity, DEFAULT_ACTIVITY_LIMIT, DEFAULT_LOOKBACK_MINUTES};
use crate::error::{ProxyError, ProxyResult};
use crate::loki::{service_selector, stream_lines, Direction, RangeQuery};
use crate::state::ProxyState;
use crate::time::{ms_to_ns, now_ms, TimeWindow};

pub const DEFAULT_RANGE_LIMIT: u32 = 500;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Backend URLs handed to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUrls {
    pub prometheus_url: String,
    pub loki_url: String,
    pub tempo_url: String,
    pub collector_http: String,
    pub collector_grpc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub telemetry: TelemetryUrls,
    pub agents: Vec<AgentRegistration>,
}

/// Query parameters arrive as strings so that malformed numbers map to a
/// structured `bad_request` instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstantParams {
    pub query: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub query: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    /// Minutes.
    pub lookback: Option<String>,
    pub limit: Option<String>,
}

// ============================================================================
// Parameter parsing
// ============================================================================

fn parse_ms(name: &str, value: Option<&str>) -> ProxyResult<Option<i64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ProxyError::bad_request(format!("'{}' must be milliseconds since epoch, got '{}'", name, v))),
    }
}

fn parse_positive(name: &str, value: Option<&str>, default: u32) -> ProxyResult<u32> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ProxyError::bad_request(format!(
                "'{}' must be a positive integer, got '{}'",
                name, v
            ))),
        },
    }
}

fn require_query(query: Option<String>) -> ProxyResult<String> {
    query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ProxyError::bad_request("missing 'query' parameter"))
}

impl RangeParams {
    pub fn into_range_query(self, now_ms: i64) -> ProxyResult<RangeQuery> {
        let query = require_query(self.query)?;
        let window = TimeWindow::resolve(
            parse_ms("start", self.start.as_deref())?,
            parse_ms("end", self.end.as_deref())?,
            now_ms,
        )?;
        let limit = parse_positive("limit", self.limit.as_deref(), DEFAULT_RANGE_LIMIT)?;
        let direction = match self.direction.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => d.parse()?,
            None => Direction::default(),
        };

        Ok(RangeQuery {
            query,
            window,
            limit,
            direction,
        })
    }
}

/// Series parameters: optional window plus any number of `match` or
/// `match[]` selectors.
fn parse_series_params(raw: Option<&str>, now_ms: i64) -> ProxyResult<(TimeWindow, Vec<String>)> {
    let mut start = None;
    let mut end = None;
    let mut matches = Vec::new();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "start" => start = Some(value.into_owned()),
            "end" => end = Some(value.into_owned()),
            "match" | "match[]" => matches.push(value.into_owned()),
            _ => {}
        }
    }

    let window = TimeWindow::resolve(
        parse_ms("start", start.as_deref())?,
        parse_ms("end", end.as_deref())?,
        now_ms,
    )?;
    Ok((window, matches))
}

// ============================================================================
// Handlers
// ============================================================================

/// Backend URLs and registered agents.
pub async fn get_config(State(state): State<ProxyState>) -> ProxyResult<Json<ConfigResponse>> {
    observability::record_request("config");

    let stack = &state.stack;
    let agents = state.store.list_agents().await?;

    Ok(Json(ConfigResponse {
        telemetry: TelemetryUrls {
            prometheus_url: stack.prometheus_url(),
            loki_url: stack.loki_url(),
            tempo_url: stack.tempo_url(),
            collector_http: stack.collector.endpoint_http.clone(),
            collector_grpc: stack.collector.endpoint_grpc.clone(),
        },
        agents,
    }))
}

pub async fn label_values(
    State(state): State<ProxyState>,
    Path(name): Path<String>,
    Query(params): Query<WindowParams>,
) -> ProxyResult<Json<Value>> {
    observability::record_request("label_values");

    let start = parse_ms("start", params.start.as_deref())?;
    let end = parse_ms("end", params.end.as_deref())?;
    let window = if start.is_some() || end.is_some() {
        Some(TimeWindow::resolve(start, end, now_ms())?)
    } else {
        None
    };

    Ok(Json(state.loki.label_values(&name, window).await?))
}

pub async fn series(State(state): State<ProxyState>, RawQuery(raw): RawQuery) -> ProxyResult<Json<Value>> {
    observability::record_request("series");

    let (window, matches) = parse_series_params(raw.as_deref(), now_ms())?;
    Ok(Json(state.loki.series(window, &matches).await?))
}

pub async fn query(
    State(state): State<ProxyState>,
    Query(params): Query<InstantParams>,
) -> ProxyResult<Json<Value>> {
    observability::record_request("query");

    let query = require_query(params.query)?;
    let time_ns = match parse_ms("time", params.time.as_deref())? {
        Some(ms) => Some(
            ms_to_ns(ms).ok_or_else(|| ProxyError::bad_request(format!("timestamp {} out of range", ms)))?,
        ),
        None => None,
    };

    Ok(Json(state.loki.query(&query, time_ns).await?))
}

pub async fn query_range(
    State(state): State<ProxyState>,
    Query(params): Query<RangeParams>,
) -> ProxyResult<Json<Value>> {
    observability::record_request("query_range");

    let request = params.into_range_query(now_ms())?;
    Ok(Json(state.loki.query_range(&request).await?))
}

/// Online flag, last message and error count for one agent.
pub async fn agent_activity(
    State(state): State<ProxyState>,
    Path(name): Path<String>,
    Query(params): Query<ActivityParams>,
) -> ProxyResult<Json<AgentActivity>> {
    observability::record_request("agent_activity");

    let lookback = parse_positive("lookback", params.lookback.as_deref(), DEFAULT_LOOKBACK_MINUTES)?;
    let limit = parse_positive("limit", params.limit.as_deref(), DEFAULT_ACTIVITY_LIMIT)?;
    let now = now_ms();

    let request = RangeQuery {
        query: service_selector(&name),
        window: TimeWindow::lookback(i64::from(lookback), now)?,
        limit,
        direction: Direction::Backward,
    };
    let body = state.loki.query_range(&request).await?;
    let lines = stream_lines(&body)?;

    Ok(Json(AgentActivity::summarize(lines, now)))
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<ProxyState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyErrorKind;

    #[test]
    fn test_range_defaults() {
        let request = RangeParams {
            query: Some("{a=\"b\"}".into()),
            ..Default::default()
        }
        .into_range_query(1_700_000_300_000)
        .unwrap();

        assert_eq!(request.limit, 500);
        assert_eq!(request.direction, Direction::Backward);
        assert_eq!(request.window.end_ms, 1_700_000_300_000);
        assert_eq!(request.window.start_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_range_validation() {
        let base = || RangeParams {
            query: Some("{a=\"b\"}".into()),
            ..Default::default()
        };

        let missing_query = RangeParams::default().into_range_query(0).unwrap_err();
        assert_eq!(missing_query.kind, ProxyErrorKind::BadRequest);

        for limit in ["0", "-5", "lots"] {
            let params = RangeParams {
                limit: Some(limit.into()),
                ..base()
            };
            assert_eq!(params.into_range_query(0).unwrap_err().kind, ProxyErrorKind::BadRequest);
        }

        let params = RangeParams {
            direction: Some("up".into()),
            ..base()
        };
        assert_eq!(params.into_range_query(0).unwrap_err().kind, ProxyErrorKind::BadRequest);

        let params = RangeParams {
            start: Some("yesterday".into()),
            ..base()
        };
        assert_eq!(params.into_range_query(0).unwrap_err().kind, ProxyErrorKind::BadRequest);
    }

    #[test]
    fn test_series_params_collect_both_match_spellings() {
        let raw = "match=%7Ba%3D%22b%22%7D&match%5B%5D=%7Bc%3D%22d%22%7D&start=1000&end=2000";
        let (window, matches) = parse_series_params(Some(raw), 0).unwrap();

        assert_eq!(window, TimeWindow { start_ms: 1000, end_ms: 2000 });
        assert_eq!(matches, vec!["{a=\"b\"}".to_string(), "{c=\"d\"}".to_string()]);
    }

    #[test]
    fn test_minimum_end_is_bad_request() {
        let params = RangeParams {
            query: Some("{a=\"b\"}".into()),
            end: Some(i64::MIN.to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_range_query(0).unwrap_err().kind, ProxyErrorKind::BadRequest);

        let raw = format!("end={}", i64::MIN);
        let err = parse_series_params(Some(&raw), 0).unwrap_err();
        assert_eq!(err.kind, ProxyErrorKind::BadRequest);
    }

    #[test]
    fn test_series_params_default_window() {
        let (window, matches) = parse_series_params(None, 600_000).unwrap();
        assert_eq!(window, TimeWindow { start_ms: 300_000, end_ms: 600_000 });
        assert!(matches.is_empty());
    }
}
