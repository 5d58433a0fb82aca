use crate::{ConfigError, Flow, Step};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One entry of the configured adapter list: which implementation to
/// instantiate (`adapter`) under which identifier (`id`), plus an opaque
/// initialization payload the adapter decodes itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub id: String,
    pub adapter: String,
    pub config: serde_json::Value,
}

/// Top-level typed config, deserialized once at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub rpc_urls: HashMap<u64, String>,
}

/// Loads and validates the YAML config file, then serves lookup-by-id
/// access to adapters, flows and global variables for the lifetime of
/// the process.
pub struct ConfigProvider {
    config: Config,
}

impl ConfigProvider {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        Self::validate(&config)?;
        tracing::info!(
            "Loaded config: {} adapters, {} flows",
            config.adapters.len(),
            config.flows.len()
        );
        Ok(Self { config })
    }

    /// Structural invariants the schema cannot express through serde alone:
    /// both sections present and non-empty, ids unique, every flow has at
    /// least one step.
    fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.adapters.is_empty() {
            return Err(ConfigError::MissingSection("adapters"));
        }
        if config.flows.is_empty() {
            return Err(ConfigError::MissingSection("flows"));
        }

        let mut adapter_ids = HashSet::new();
        for adapter in &config.adapters {
            if !adapter_ids.insert(adapter.id.as_str()) {
                return Err(ConfigError::DuplicateAdapterId(adapter.id.clone()));
            }
        }

        let mut flow_ids = HashSet::new();
        for flow in &config.flows {
            if !flow_ids.insert(flow.id.as_str()) {
                return Err(ConfigError::DuplicateFlowId(flow.id.clone()));
            }
            if flow.steps.is_empty() {
                return Err(ConfigError::EmptyFlow(flow.id.clone()));
            }
        }

        Ok(())
    }

    pub fn adapters(&self) -> &[AdapterConfig] {
        &self.config.adapters
    }

    pub fn flows(&self) -> &[Flow] {
        &self.config.flows
    }

    pub fn get_adapter_config(&self, adapter_id: &str) -> Option<&AdapterConfig> {
        self.config.adapters.iter().find(|a| a.id == adapter_id)
    }

    pub fn get_flow_by_id(&self, flow_id: &str) -> Option<&Flow> {
        self.config.flows.iter().find(|f| f.id == flow_id)
    }

    pub fn get_step_from_flow(&self, flow_id: &str, index: usize) -> Option<&Step> {
        self.get_flow_by_id(flow_id).and_then(|f| f.step(index))
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.config.variables.get(name).map(String::as_str)
    }

    pub fn get_rpc_url(&self, chain_id: u64) -> Option<&str> {
        self.config.rpc_urls.get(&chain_id).map(String::as_str)
    }
}
