use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_manager_name() -> String {
    "experiment-controller".to_string()
}

fn default_source_not_found_requeue_secs() -> u64 {
    30
}

fn default_not_ready_requeue_secs() -> u64 {
    15
}

fn default_capability_ttl_secs() -> u64 {
    300
}

fn default_conflict_retries() -> u32 {
    3
}

/// Loaded from `EXPDEP_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Watch a single namespace. Unset watches all namespaces.
    pub namespace: Option<String>,
    #[serde(default = "default_manager_name")]
    pub name: String,
    #[serde(default = "default_source_not_found_requeue_secs")]
    pub source_not_found_requeue_secs: u64,
    #[serde(default = "default_not_ready_requeue_secs")]
    pub not_ready_requeue_secs: u64,
    #[serde(default = "default_capability_ttl_secs")]
    pub capability_ttl_secs: u64,
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            name: default_manager_name(),
            source_not_found_requeue_secs: default_source_not_found_requeue_secs(),
            not_ready_requeue_secs: default_not_ready_requeue_secs(),
            capability_ttl_secs: default_capability_ttl_secs(),
            conflict_retries: default_conflict_retries(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, config::ConfigError> {
        Self::from_source(config::Environment::with_prefix("EXPDEP").try_parsing(true))
    }

    fn from_source(
        source: impl config::Source + Send + Sync + 'static,
    ) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn source_not_found_requeue(&self) -> Duration {
        Duration::from_secs(self.source_not_found_requeue_secs)
    }

    pub fn not_ready_requeue(&self) -> Duration {
        Duration::from_secs(self.not_ready_requeue_secs)
    }

    pub fn capability_ttl(&self) -> Duration {
        Duration::from_secs(self.capability_ttl_secs)
    }
}
