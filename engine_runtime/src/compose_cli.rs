//! CLI-based compose engine.
//!
//! This module drives the `docker compose` plugin (or any CLI with the same
//! surface, e.g. `podman compose`) as a child process.
//!
//! # Requirements
//!
//! - the engine binary must be installed and in PATH (or configured by path)
//! - the engine daemon must be reachable by the invoking user
//!
//! Every invocation is bounded by a timeout and the child is killed when it
//! expires. `up` gets its own, longer bound since it may pull images.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{ComposeEngine, EngineError, Result};

/// Configuration for DockerComposeCli.
#[derive(Debug, Clone)]
pub struct ComposeCliConfig {
    /// Path to the engine binary (default: "docker")
    pub binary: PathBuf,
    /// Timeout for `version`, `port` and `down` (default: 30s)
    pub command_timeout: Duration,
    /// Timeout for `up`, which includes image pulls (default: 600s)
    pub up_timeout: Duration,
}

impl ComposeCliConfig {
    /// Bound for one compose subcommand.
    pub fn timeout_for(&self, subcommand: &str) -> Duration {
        match subcommand {
            "up" => self.up_timeout,
            _ => self.command_timeout,
        }
    }
}

impl Default for ComposeCliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("docker"),
            command_timeout: Duration::from_secs(30),
            up_timeout: Duration::from_secs(600),
        }
    }
}

/// `docker compose` driver.
#[derive(Debug, Clone)]
pub struct DockerComposeCli {
    config: ComposeCliConfig,
}

impl DockerComposeCli {
    pub fn new() -> Self {
        Self::with_config(ComposeCliConfig::default())
    }

    pub fn with_config(config: ComposeCliConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposeCliConfig {
        &self.config
    }

    // ==================== CLI Helper Methods ====================

    /// Execute `<binary> compose <args>` with timeout.
    async fn exec_compose(&self, args: &[&str], timeout: Duration) -> Result<std::process::Output> {
        let cmd_str = format!("{} compose {}", self.config.binary.display(), args.join(" "));
        debug!("Executing: {}", cmd_str);

        let child = Command::new(&self.config.binary)
            .arg("compose")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| EngineError::Timeout(cmd_str.clone()))?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    EngineError::BinaryNotFound(format!("{:?}: {}", self.config.binary, e))
                }
                _ => EngineError::Io(e),
            })?;

        Ok(output)
    }

    /// Execute against a manifest and fail on non-zero exit.
    async fn exec_manifest(&self, manifest: &Path, args: &[&str]) -> Result<std::process::Output> {
        let manifest_str = manifest.to_string_lossy();
        let mut full = vec!["-f", &*manifest_str];
        full.extend_from_slice(args);

        let timeout = self.config.timeout_for(args.first().copied().unwrap_or_default());
        let output = self.exec_compose(&full, timeout).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::CommandFailed {
                command: args.join(" "),
                message: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Default for DockerComposeCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComposeEngine for DockerComposeCli {
    async fn verify(&self) -> Result<String> {
        let output = self
            .exec_compose(&["version", "--short"], self.config.timeout_for("version"))
            .await?;

        if !output.status.success() {
            return Err(EngineError::BinaryNotFound(format!(
                "{:?} compose returned non-zero exit code: {}",
                self.config.binary,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Compose version: {}", version);
        Ok(version)
    }

    async fn up(&self, manifest: &Path) -> Result<()> {
        self.exec_manifest(manifest, &["up", "-d"]).await?;
        debug!("Stack {:?} is up", manifest);
        Ok(())
    }

    async fn down(&self, manifest: &Path) -> Result<()> {
        self.exec_manifest(manifest, &["down"]).await?;
        debug!("Stack {:?} is down", manifest);
        Ok(())
    }

    async fn port(&self, manifest: &Path, service: &str, container_port: u16) -> Result<Option<u16>> {
        let port_arg = container_port.to_string();
        let output = self
            .exec_manifest(manifest, &["port", service, &port_arg])
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_port_output(&stdout)
    }
}

/// Parse `compose port` output such as `0.0.0.0:49153` or `[::]:49153`.
///
/// Only the first non-empty line is considered. Blank output, and the
/// `:0` some engines print for an unpublished port, mean no binding.
pub fn parse_port_output(stdout: &str) -> Result<Option<u16>> {
    let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };

    let (_, port) = line
        .rsplit_once(':')
        .ok_or_else(|| EngineError::InvalidOutput(line.to_string()))?;

    match port.parse::<u16>() {
        Ok(0) => Ok(None),
        Ok(port) => Ok(Some(port)),
        Err(_) => Err(EngineError::InvalidOutput(line.to_string())),
    }
}
