//! Client for the Loki HTTP query API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ProxyError, ProxyResult};
use crate::time::{parse_ns_to_ms, TimeWindow};

const LABEL_VALUES_PATH: &str = "loki/api/v1/label";
const SERIES_PATH: &str = "loki/api/v1/series";
const QUERY_PATH: &str = "loki/api/v1/query";
const QUERY_RANGE_PATH: &str = "loki/api/v1/query_range";

/// Sort order of a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(ProxyError::bad_request(format!(
                "direction must be 'forward' or 'backward', got '{}'",
                other
            ))),
        }
    }
}

/// A validated range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub query: String,
    pub window: TimeWindow,
    pub limit: u32,
    pub direction: Direction,
}

/// One log line out of a stream result, timestamp already in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub ts_ms: i64,
    pub labels: BTreeMap<String, String>,
    pub line: String,
}

#[derive(Deserialize)]
struct StreamEntry {
    #[serde(default)]
    stream: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(i64, String)>,
}

/// Label names Loki accepts; also keeps the name safe to put in a path.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `{service_name="<name>"}` with the value escaped for LogQL.
pub fn service_selector(service_name: &str) -> String {
    let escaped = service_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{{service_name=\"{}\"}}", escaped)
}

#[derive(Debug, Clone)]
pub struct LokiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LokiClient {
    pub fn new(base_url: Url, timeout: Duration) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Distinct values of one label.
    pub async fn label_values(&self, name: &str, window: Option<TimeWindow>) -> ProxyResult<Value> {
        if !is_valid_label_name(name) {
            return Err(ProxyError::bad_request(format!("invalid label name '{}'", name)));
        }

        let mut params = Vec::new();
        if let Some(window) = window {
            push_window(&mut params, &window)?;
        }
        self.get(&format!("{}/{}/values", LABEL_VALUES_PATH, name), &params)
            .await
    }

    /// Label sets of the streams matching any of `matches`.
    pub async fn series(&self, window: TimeWindow, matches: &[String]) -> ProxyResult<Value> {
        let mut params = Vec::new();
        push_window(&mut params, &window)?;
        for selector in matches {
            params.push(("match[]", selector.clone()));
        }
        self.get(SERIES_PATH, &params).await
    }

    /// Instant query. `time_ns` defaults to now on the Loki side.
    pub async fn query(&self, query: &str, time_ns: Option<i64>) -> ProxyResult<Value> {
        let mut params = vec![("query", query.to_string())];
        if let Some(time_ns) = time_ns {
            params.push(("time", time_ns.to_string()));
        }
        let mut body = self.get(QUERY_PATH, &params).await?;
        normalize_stream_timestamps(&mut body)?;
        Ok(body)
    }

    /// Range query. Stream timestamps in the result are converted to milliseconds.
    pub async fn query_range(&self, request: &RangeQuery) -> ProxyResult<Value> {
        let mut params = vec![("query", request.query.clone())];
        push_window(&mut params, &request.window)?;
        params.push(("limit", request.limit.to_string()));
        params.push(("direction", request.direction.to_string()));

        let mut body = self.get(QUERY_RANGE_PATH, &params).await?;
        normalize_stream_timestamps(&mut body)?;
        Ok(body)
    }

    #[instrument(skip(self, params), fields(base = %self.base_url))]
    async fn get(&self, path: &str, params: &[(&str, String)]) -> ProxyResult<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProxyError::internal(format!("invalid upstream path '{}': {}", path, e)))?;
        debug!("GET {} {:?}", url, params);

        let response = self.http.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::bad_status(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProxyError::decode(format!("invalid JSON from log backend: {}", e)))
    }
}

fn push_window(params: &mut Vec<(&'static str, String)>, window: &TimeWindow) -> ProxyResult<()> {
    let (start_ns, end_ns) = window.to_ns()?;
    params.push(("start", start_ns.to_string()));
    params.push(("end", end_ns.to_string()));
    Ok(())
}

/// Rewrite `data.result[].values[][0]` from nanosecond strings to
/// millisecond integers when the result type is `streams`. Matrix and
/// vector results are left untouched.
pub fn normalize_stream_timestamps(body: &mut Value) -> ProxyResult<()> {
    let Some(data) = body.get_mut("data") else {
        return Err(ProxyError::decode("log backend response has no 'data'"));
    };
    if data.get("resultType").and_then(Value::as_str) != Some("streams") {
        return Ok(());
    }

    let Some(streams) = data.get_mut("result").and_then(Value::as_array_mut) else {
        return Err(ProxyError::decode("stream result is not an array"));
    };

    for stream in streams {
        let Some(values) = stream.get_mut("values").and_then(Value::as_array_mut) else {
            continue;
        };
        for entry in values {
            let Some(ts) = entry.get_mut(0) else {
                return Err(ProxyError::decode("empty stream value"));
            };
            let ms = ts
                .as_str()
                .and_then(parse_ns_to_ms)
                .ok_or_else(|| ProxyError::decode(format!("invalid nanosecond timestamp {}", ts)))?;
            *ts = Value::from(ms);
        }
    }
    Ok(())
}

/// Flatten a normalized stream result into lines, newest first.
pub fn stream_lines(body: &Value) -> ProxyResult<Vec<LogLine>> {
    let result = body
        .get("data")
        .and_then(|d| d.get("result"))
        .cloned()
        .unwrap_or(Value::Array(Vec::new()));
    let entries: Vec<StreamEntry> = serde_json::from_value(result)
        .map_err(|e| ProxyError::decode(format!("unexpected stream result shape: {}", e)))?;

    let mut lines: Vec<LogLine> = entries
        .into_iter()
        .flat_map(|entry| {
            let labels = entry.stream;
            entry.values.into_iter().map(move |(ts_ms, line)| LogLine {
                ts_ms,
                labels: labels.clone(),
                line,
            })
        })
        .collect();
    lines.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
    Ok(lines)
}
