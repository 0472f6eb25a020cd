//! Deployer configuration

use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Registry used for images without an explicit registry host
pub const DEFAULT_REGISTRY: &str = "index.docker.io";

/// Rollout coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Registry assumed for unqualified image names
    pub default_registry: String,
    /// Seconds a started container has to report running
    pub health_timeout_secs: u64,
    /// Milliseconds between status polls during the health-wait
    pub health_poll_interval_ms: u64,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            default_registry: DEFAULT_REGISTRY.to_string(),
            health_timeout_secs: 20,
            health_poll_interval_ms: 500,
        }
    }
}

impl DeployerConfig {
    /// Parse YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| GridError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as YAML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.default_registry.trim().is_empty() {
            return Err(GridError::InvalidConfig(
                "default_registry must not be empty".to_string(),
            ));
        }
        if self.health_timeout_secs == 0 {
            return Err(GridError::InvalidConfig(
                "health_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.health_poll_interval_ms == 0 {
            return Err(GridError::InvalidConfig(
                "health_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.health_poll_interval() >= self.health_timeout() {
            return Err(GridError::InvalidConfig(
                "health_poll_interval_ms must be shorter than the health timeout".to_string(),
            ));
        }
        Ok(())
    }

    /// Health-wait deadline
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Health-wait poll interval
    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }
}
