//! Registry configuration

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Store directory path
    pub store_path: PathBuf,

    /// Default network population
    pub bootstrap: BootstrapConfig,

    /// Rendered peer configuration settings
    pub render: RenderConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_path: crate::default_store_path(),
            bootstrap: BootstrapConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Default network created on first use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Populate the default network when the registry is opened
    pub enabled: bool,

    /// Reserved network name; its presence marks bootstrap as done
    pub network_name: String,

    pub cidr: String,

    pub description: String,

    /// Peers addressed sequentially from the second usable host
    pub peers: Vec<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            network_name: "BlackRoad-Pi".to_string(),
            cidr: "10.0.0.0/8".to_string(),
            description: "BlackRoad Pi mesh network".to_string(),
            peers: ["aria64", "alice", "blackroad-pi", "macbook"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Settings templated into rendered peer configs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub listen_port: u16,

    pub dns: Vec<String>,

    /// Gateway endpoint. Defaults to the network's first usable host.
    pub endpoint: Option<String>,

    pub persistent_keepalive: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            listen_port: 51820,
            dns: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
            endpoint: None,
            persistent_keepalive: 25,
        }
    }
}

impl RegistryConfig {
    /// Config rooted at a specific store directory
    pub fn with_store(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..Default::default()
        }
    }

    /// Load configuration from file, falling back to defaults if it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the database path
    pub fn db_path(&self) -> PathBuf {
        self.store_path.join("registry.db")
    }

    /// Get the default config file path
    pub fn config_path(&self) -> PathBuf {
        self.store_path.join("config.toml")
    }
}
