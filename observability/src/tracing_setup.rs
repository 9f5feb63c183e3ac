//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ObservabilityError;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,query_proxy=debug,tower_http=info";

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directives applied when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl TracingConfig {
    /// Quiet defaults for interactive commands: warnings only, no targets.
    pub fn cli() -> Self {
        Self {
            default_filter: "warn".to_string(),
            json: false,
            with_target: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber. Events go to stderr.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<(), ObservabilityError> {
    let (plain, json) = if config.json {
        let layer = fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_target(config.with_target)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(plain)
        .with(json)
        .try_init()?;

    tracing::debug!("Tracing initialized (json: {})", config.json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let config = TracingConfig::default();
        assert_eq!(config.default_filter, DEFAULT_FILTER);
        assert!(!config.json);
    }

    #[test]
    fn test_builders() {
        let config = TracingConfig::cli().with_json(true).with_default_filter("debug");
        assert!(config.json);
        assert!(!config.with_target);
        assert_eq!(config.default_filter, "debug");
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing(TracingConfig::default());
        assert!(init_tracing(TracingConfig::default()).is_err());
    }
}
