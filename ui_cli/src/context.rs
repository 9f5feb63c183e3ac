//! Per-invocation context: data directory, operator config, state store.

use std::path::Path;
use std::sync::Arc;

use engine_runtime::{ComposeCliConfig, ComposeEngine, DockerComposeCli};
use stack_config::{StackConfig, StackPaths};
use stack_core::Lifecycle;
use stack_shared_types::{default_services, StackState};
use state_store_interface::{JsonFileStore, StateStore};

use crate::error::CliError;

pub struct Context {
    pub paths: StackPaths,
    pub config: StackConfig,
    pub store: Arc<JsonFileStore>,
}

impl Context {
    pub fn load(home: Option<&Path>) -> Result<Self, CliError> {
        let root = stack_config::data_dir(home)?;
        let config = StackConfig::load(&root)?;
        tracing::debug!("Data directory {:?}", root);

        Ok(Self {
            store: Arc::new(JsonFileStore::new(&root)),
            paths: StackPaths::new(root),
            config,
        })
    }

    pub async fn load_state(&self) -> Result<StackState, CliError> {
        Ok(self.store.load().await?)
    }

    pub fn engine(&self) -> Arc<dyn ComposeEngine> {
        Arc::new(DockerComposeCli::with_config(ComposeCliConfig {
            binary: self.config.engine.binary.clone(),
            command_timeout: self.config.engine.command_timeout(),
            up_timeout: self.config.engine.up_timeout(),
        }))
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(self.engine(), default_services(), self.paths.manifest())
    }
}
