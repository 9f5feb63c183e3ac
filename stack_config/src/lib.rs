//! Operator configuration for the local telemetry stack.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! $A2A_HOME (default ~/.a2a)
//! ├── stack.toml            optional operator overrides
//! ├── config.json           persisted stack state
//! ├── agents.json           agent registry
//! ├── docker-compose.yml    orchestration manifest
//! ├── otel-collector.yaml
//! ├── prometheus.yml
//! └── tempo.yaml
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const HOME_ENV: &str = "A2A_HOME";
pub const ENGINE_BINARY_ENV: &str = "A2A_ENGINE_BINARY";
pub const DASHBOARD_DIR_ENV: &str = "A2A_DASHBOARD_DIR";

pub const CONFIG_FILE: &str = "stack.toml";
pub const MANIFEST_FILE: &str = "docker-compose.yml";
pub const COLLECTOR_CONFIG_FILE: &str = "otel-collector.yaml";
pub const PROMETHEUS_CONFIG_FILE: &str = "prometheus.yml";
pub const TEMPO_CONFIG_FILE: &str = "tempo.yaml";

const DEFAULT_DIR_NAME: &str = ".a2a";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot determine home directory; set {HOME_ENV}")]
    NoHomeDir,
}

/// Resolve the data directory.
///
/// Resolution order:
/// 1. explicit override (the CLI `--home` flag)
/// 2. `A2A_HOME` environment variable
/// 3. `~/.a2a`
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// Orchestration engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary; invoked as `<binary> compose ...`.
    pub binary: PathBuf,
    /// Upper bound for `version`, `port` and `down`.
    pub command_timeout_secs: u64,
    /// Upper bound for `up`, image pulls included.
    pub up_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("docker"),
            command_timeout_secs: 30,
            up_timeout_secs: 600,
        }
    }
}

impl EngineConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn up_timeout(&self) -> Duration {
        Duration::from_secs(self.up_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// How many ports above the preferred one the allocator may try.
    pub scan_window: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self { scan_window: 100 }
    }
}

/// Container images of the four backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub collector: String,
    pub prometheus: String,
    pub loki: String,
    pub tempo: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            collector: "otel/opentelemetry-collector-contrib:0.111.0".to_string(),
            prometheus: "prom/prometheus:v2.54.1".to_string(),
            loki: "grafana/loki:3.2.0".to_string(),
            tempo: "grafana/tempo:2.6.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Built dashboard assets served by the proxy. Not served when unset.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub upstream_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: 10,
        }
    }
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Contents of `stack.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub engine: EngineConfig,
    pub ports: PortsConfig,
    pub images: ImagesConfig,
    pub dashboard: DashboardConfig,
    pub proxy: ProxyConfig,
}

impl StackConfig {
    /// Load `stack.toml` from the data directory, falling back to defaults
    /// when the file is absent, then apply environment overrides.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {:?}, using defaults", path);
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(binary) = lookup(ENGINE_BINARY_ENV) {
            self.engine.binary = PathBuf::from(binary);
        }
        if let Some(dir) = lookup(DASHBOARD_DIR_ENV) {
            self.dashboard.static_dir = Some(PathBuf::from(dir));
        }
    }
}

/// File locations inside one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPaths {
    pub root: PathBuf,
}

impl StackPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// A generated document, by file name.
    pub fn document(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = StackConfig::load(dir.path()).unwrap();
        assert_eq!(config.ports.scan_window, 100);
        assert_eq!(config.engine.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.engine.up_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let content = r#"
            [engine]
            binary = "/usr/local/bin/podman"

            [ports]
            scan_window = 20
        "#;
        let config = StackConfig::from_toml(content, Path::new("stack.toml")).unwrap();
        assert_eq!(config.engine.binary, PathBuf::from("/usr/local/bin/podman"));
        assert_eq!(config.engine.command_timeout_secs, 30);
        assert_eq!(config.engine.up_timeout_secs, 600);
        assert_eq!(config.ports.scan_window, 20);
        assert_eq!(config.images, ImagesConfig::default());
    }

    #[test]
    fn test_engine_timeouts_configurable() {
        let content = r#"
            [engine]
            command_timeout_secs = 10
            up_timeout_secs = 1200
        "#;
        let config = StackConfig::from_toml(content, Path::new("stack.toml")).unwrap();
        assert_eq!(config.engine.command_timeout(), Duration::from_secs(10));
        assert_eq!(config.engine.up_timeout(), Duration::from_secs(1200));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = StackConfig::from_toml("[ports]\nscan_window = \"many\"", Path::new("x/stack.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("stack.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = StackConfig::default();
        config.apply_env_overrides(|key| match key {
            ENGINE_BINARY_ENV => Some("nerdctl".to_string()),
            DASHBOARD_DIR_ENV => Some("/srv/dashboard".to_string()),
            _ => None,
        });
        assert_eq!(config.engine.binary, PathBuf::from("nerdctl"));
        assert_eq!(config.dashboard.static_dir, Some(PathBuf::from("/srv/dashboard")));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = data_dir(Some(Path::new("/tmp/a2a-test"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/a2a-test"));
    }

    #[test]
    fn test_paths_layout() {
        let paths = StackPaths::new("/home/op/.a2a");
        assert_eq!(paths.manifest(), PathBuf::from("/home/op/.a2a/docker-compose.yml"));
        assert_eq!(paths.document(TEMPO_CONFIG_FILE), PathBuf::from("/home/op/.a2a/tempo.yaml"));
    }
}
