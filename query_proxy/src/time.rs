//! Millisecond/nanosecond conversion and default query windows.
//!
//! The dashboard speaks milliseconds since epoch, Loki nanoseconds.
//! Going down to milliseconds truncates: up to 999,999 ns are dropped.

use crate::error::{ProxyError, ProxyResult};

pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Window used when the dashboard sends no start.
pub const DEFAULT_LOOKBACK_MS: i64 = 5 * 60 * 1000;

/// Exact conversion. `None` on overflow.
pub fn ms_to_ns(ms: i64) -> Option<i64> {
    ms.checked_mul(NANOS_PER_MILLI)
}

/// Truncating conversion, rounding toward negative infinity.
pub fn ns_to_ms(ns: i64) -> i64 {
    ns.div_euclid(NANOS_PER_MILLI)
}

/// Parse a Loki nanosecond timestamp string into milliseconds.
pub fn parse_ns_to_ms(ns: &str) -> Option<i64> {
    ns.parse::<i64>().ok().map(ns_to_ms)
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A resolved `[start, end]` window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// Fill in missing bounds: `end` defaults to `now_ms`, `start` to five
    /// minutes before `end`.
    pub fn resolve(start_ms: Option<i64>, end_ms: Option<i64>, now_ms: i64) -> ProxyResult<Self> {
        let end_ms = end_ms.unwrap_or(now_ms);
        let start_ms = match start_ms {
            Some(start_ms) => start_ms,
            None => end_ms
                .checked_sub(DEFAULT_LOOKBACK_MS)
                .ok_or_else(|| ProxyError::bad_request(format!("end ({}) out of range", end_ms)))?,
        };
        if start_ms > end_ms {
            return Err(ProxyError::bad_request(format!(
                "start ({}) is after end ({})",
                start_ms, end_ms
            )));
        }
        Ok(Self { start_ms, end_ms })
    }

    /// The last `minutes` minutes ending at `now_ms`.
    pub fn lookback(minutes: i64, now_ms: i64) -> ProxyResult<Self> {
        let start_ms = minutes
            .checked_mul(60_000)
            .and_then(|span| now_ms.checked_sub(span))
            .ok_or_else(|| ProxyError::bad_request(format!("lookback of {} minutes out of range", minutes)))?;
        Ok(Self {
            start_ms,
            end_ms: now_ms,
        })
    }

    /// `(start, end)` in nanoseconds, as Loki expects them.
    pub fn to_ns(&self) -> ProxyResult<(i64, i64)> {
        let convert = |ms: i64| {
            ms_to_ns(ms).ok_or_else(|| ProxyError::bad_request(format!("timestamp {} out of range", ms)))
        };
        Ok((convert(self.start_ms)?, convert(self.end_ms)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_ns_is_exact() {
        assert_eq!(ms_to_ns(1_700_000_000_000), Some(1_700_000_000_000_000_000));
        assert_eq!(ms_to_ns(i64::MAX), None);
    }

    #[test]
    fn test_round_trip_on_exact_multiples() {
        for ms in [0, 1, 1_700_000_000_000, 1_700_000_300_000] {
            assert_eq!(ns_to_ms(ms_to_ns(ms).unwrap()), ms);
        }
    }

    #[test]
    fn test_ns_to_ms_truncates_downward() {
        assert_eq!(ns_to_ms(1_700_000_000_999_999_999), 1_700_000_000_999);
        assert_eq!(ns_to_ms(1_999_999), 1);
        assert_eq!(ns_to_ms(999_999), 0);
        assert_eq!(ns_to_ms(-1), -1);
    }

    #[test]
    fn test_parse_ns_string() {
        assert_eq!(parse_ns_to_ms("1700000000123456789"), Some(1_700_000_000_123));
        assert_eq!(parse_ns_to_ms("not-a-number"), None);
    }

    #[test]
    fn test_default_window() {
        let window = TimeWindow::resolve(None, None, 1_700_000_300_000).unwrap();
        assert_eq!(window.end_ms, 1_700_000_300_000);
        assert_eq!(window.start_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_start_defaults_relative_to_explicit_end() {
        let window = TimeWindow::resolve(None, Some(600_000), 9_999_999).unwrap();
        assert_eq!(window, TimeWindow { start_ms: 300_000, end_ms: 600_000 });
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = TimeWindow::resolve(Some(2), Some(1), 0).unwrap_err();
        assert_eq!(err.kind, crate::error::ProxyErrorKind::BadRequest);
    }

    #[test]
    fn test_extreme_end_without_start_rejected() {
        let err = TimeWindow::resolve(None, Some(i64::MIN), 0).unwrap_err();
        assert_eq!(err.kind, crate::error::ProxyErrorKind::BadRequest);

        let window = TimeWindow::resolve(Some(i64::MIN), Some(i64::MIN), 0).unwrap();
        assert_eq!(window.start_ms, i64::MIN);
    }

    #[test]
    fn test_lookback() {
        assert_eq!(
            TimeWindow::lookback(5, 1_700_000_300_000).unwrap(),
            TimeWindow { start_ms: 1_700_000_000_000, end_ms: 1_700_000_300_000 }
        );
        let err = TimeWindow::lookback(i64::MAX, 0).unwrap_err();
        assert_eq!(err.kind, crate::error::ProxyErrorKind::BadRequest);
        assert!(TimeWindow::lookback(1, i64::MIN).is_err());
    }

    #[test]
    fn test_window_to_ns() {
        let window = TimeWindow::resolve(Some(1_700_000_000_000), Some(1_700_000_300_000), 0).unwrap();
        assert_eq!(
            window.to_ns().unwrap(),
            (1_700_000_000_000_000_000, 1_700_000_300_000_000_000)
        );
    }
}
