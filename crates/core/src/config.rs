//! Runtime configuration
//!
//! Configuration can be loaded from a TOML file and/or environment variables.
//! Every field has a default, so an empty file is a valid configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the library's logging setup and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// `tracing` filter directive, e.g. `info` or `mapagg_core=debug`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,

    /// Report per-stage timing after a run
    #[serde(default)]
    pub benchmark: bool,

    /// Resource type used when wrapping raw JSON input
    #[serde(default = "default_resource_type")]
    pub default_resource_type: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_resource_type() -> String {
    "generic".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
            benchmark: false,
            default_resource_type: default_resource_type(),
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply `MAPAGG_*` environment variables on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(filter) = std::env::var("MAPAGG_LOG") {
            self.log_filter = filter;
        }
        if let Ok(json) = std::env::var("MAPAGG_JSON_LOGS") {
            if let Ok(json) = json.parse() {
                self.json_logs = json;
            }
        }
        if let Ok(benchmark) = std::env::var("MAPAGG_BENCHMARK") {
            if let Ok(benchmark) = benchmark.parse() {
                self.benchmark = benchmark;
            }
        }
        if let Ok(resource_type) = std::env::var("MAPAGG_RESOURCE_TYPE") {
            self.default_resource_type = resource_type;
        }
        self
    }

    /// Load from `path` when given, otherwise start from defaults; then
    /// apply environment overrides
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }
}
