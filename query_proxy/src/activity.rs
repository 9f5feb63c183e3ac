//! Per-agent activity summary derived from recent log lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::loki::LogLine;

/// An agent is online when its newest line is younger than this.
pub const ONLINE_THRESHOLD_MS: i64 = 60_000;

pub const DEFAULT_LOOKBACK_MINUTES: u32 = 5;
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 250;

const SEVERITY_LABEL: &str = "severity";
const TO_LABELS: [&str; 2] = ["a2a_to", "a2a.to"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub online: bool,
    pub last_ts_ms: Option<i64>,
    pub last_line: String,
    pub last_to: String,
    pub error_count: usize,
    pub lines: Vec<LogLine>,
}

pub fn is_online(last_ts_ms: i64, now_ms: i64) -> bool {
    now_ms.saturating_sub(last_ts_ms) < ONLINE_THRESHOLD_MS
}

static SEVERITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)err").expect("severity pattern compiles"));
static ERROR_WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|\W)error(\W|$)").expect("error word pattern compiles"));

/// A severity label mentioning "err", or the standalone word "error" in the text.
pub fn is_error_line(line: &LogLine) -> bool {
    let severity = line
        .labels
        .get(SEVERITY_LABEL)
        .is_some_and(|s| SEVERITY_PATTERN.is_match(s));
    severity || ERROR_WORD_PATTERN.is_match(&line.line)
}

impl AgentActivity {
    /// Summarize `lines`, which must be sorted newest first.
    pub fn summarize(lines: Vec<LogLine>, now_ms: i64) -> Self {
        if lines.is_empty() {
            return Self {
                online: false,
                last_ts_ms: None,
                last_line: String::new(),
                last_to: String::new(),
                error_count: 0,
                lines,
            };
        }

        let newest = &lines[0];

        let last_to = TO_LABELS
            .iter()
            .filter_map(|key| newest.labels.get(*key))
            .find(|value| !value.is_empty())
            .cloned()
            .unwrap_or_default();

        Self {
            online: is_online(newest.ts_ms, now_ms),
            last_ts_ms: Some(newest.ts_ms),
            last_line: newest.line.clone(),
            last_to,
            error_count: lines.iter().filter(|l| is_error_line(l)).count(),
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn line(ts_ms: i64, text: &str, labels: &[(&str, &str)]) -> LogLine {
        LogLine {
            ts_ms,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            line: text.to_string(),
        }
    }

    #[test]
    fn test_online_boundary() {
        let t0 = 1_700_000_000_000;
        assert!(is_online(t0, t0 + 59_999));
        assert!(!is_online(t0, t0 + 60_000));
        assert!(!is_online(t0, t0 + 60_001));
    }

    #[test]
    fn test_patterns_compile() {
        Lazy::force(&SEVERITY_PATTERN);
        Lazy::force(&ERROR_WORD_PATTERN);
    }

    #[test]
    fn test_error_detection() {
        assert!(is_error_line(&line(0, "ok", &[("severity", "ERROR")])));
        assert!(is_error_line(&line(0, "ok", &[("severity", "err")])));
        assert!(!is_error_line(&line(0, "ok", &[("severity", "info")])));

        assert!(is_error_line(&line(0, "Error: timeout", &[])));
        assert!(is_error_line(&line(0, "request failed (error)", &[])));
        assert!(is_error_line(&line(0, "error", &[])));
        assert!(!is_error_line(&line(0, "errors=0", &[])));
        assert!(!is_error_line(&line(0, "no_error_here", &[])));
        assert!(!is_error_line(&line(0, "terrorize", &[])));
    }

    #[test]
    fn test_summary_uses_newest_line() {
        let now = 1_700_000_030_000;
        let lines = vec![
            line(1_700_000_000_000, "handing off to critic", &[("a2a.to", "critic")]),
            line(1_699_999_990_000, "error: retrying", &[("a2a_to", "planner")]),
            line(1_699_999_980_000, "boot", &[("severity", "Error")]),
        ];

        let activity = AgentActivity::summarize(lines, now);

        assert!(activity.online);
        assert_eq!(activity.last_ts_ms, Some(1_700_000_000_000));
        assert_eq!(activity.last_line, "handing off to critic");
        assert_eq!(activity.last_to, "critic");
        assert_eq!(activity.error_count, 2);
        assert_eq!(activity.lines.len(), 3);
    }

    #[test]
    fn test_underscore_label_wins() {
        let lines = vec![line(0, "x", &[("a2a_to", "a"), ("a2a.to", "b")])];
        assert_eq!(AgentActivity::summarize(lines, 0).last_to, "a");
    }

    #[test]
    fn test_empty_summary() {
        let activity = AgentActivity::summarize(Vec::new(), 0);
        assert!(!activity.online);
        assert_eq!(activity.last_ts_ms, None);
        assert_eq!(activity.error_count, 0);
    }

    #[test]
    fn test_serialized_field_names() {
        let activity = AgentActivity::summarize(vec![line(5, "hi", &[])], 10);
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["lastTsMs"], 5);
        assert_eq!(json["errorCount"], 0);
        assert_eq!(json["lines"][0]["tsMs"], 5);
    }
}
