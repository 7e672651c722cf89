//! Run configuration file support for the harmonia CLI
//!
//! Looked up in this order:
//! - Path given with `--config`
//! - `HARMONIA_CONFIG` environment variable
//! - `harmonia.toml` in the current directory
//!
//! A missing file means the built-in defaults: the four-node sprinkler
//! network sampled with 1000 rows.

use anyhow::{bail, Context, Result};
use harmonia_bn::{HarmonyConfig, Network};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "harmonia.toml";
const CONFIG_ENV: &str = "HARMONIA_CONFIG";

/// Configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Enable colored output
    pub colored: bool,

    /// Harmony search parameters
    pub search: HarmonyConfig,

    /// Synthetic data settings
    pub data: DataConfig,

    /// Ground-truth network and edge constraints
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Number of observations sampled from the ground truth
    pub rows: usize,

    /// Seed for the ground-truth CPTs and the samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Ground-truth edges the data is sampled from
    pub edges: Vec<(String, String)>,

    /// Edges every candidate must contain
    pub required: Vec<(String, String)>,

    /// Edges no candidate may contain
    pub prohibited: Vec<(String, String)>,

    /// Variables in column order
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub label: String,
    pub states: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            colored: true,
            search: HarmonyConfig::default(),
            data: DataConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            seed: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let binary = |label: &str| NodeConfig {
            label: label.to_string(),
            states: vec!["no".to_string(), "yes".to_string()],
        };
        let edge = |u: &str, v: &str| (u.to_string(), v.to_string());

        Self {
            edges: vec![
                edge("Cloudy", "Sprinkler"),
                edge("Cloudy", "Rain"),
                edge("Sprinkler", "WetGrass"),
                edge("Rain", "WetGrass"),
            ],
            required: Vec::new(),
            prohibited: Vec::new(),
            nodes: vec![
                binary("Cloudy"),
                binary("Sprinkler"),
                binary("Rain"),
                binary("WetGrass"),
            ],
        }
    }
}

impl ModelConfig {
    /// Network with the configured nodes and no edges.
    fn empty_network(&self) -> Result<Network> {
        if self.nodes.is_empty() {
            bail!("Model defines no nodes");
        }
        let mut net = Network::new();
        for node in &self.nodes {
            net.add_node_with_states(node.label.as_str(), node.states.clone())
                .with_context(|| format!("Invalid node '{}'", node.label))?;
        }
        Ok(net)
    }

    /// Ground-truth network.
    pub fn truth_network(&self) -> Result<Network> {
        let mut net = self.empty_network()?;
        for (u, v) in &self.edges {
            net.add_edge(u, v)
                .with_context(|| format!("Invalid model edge {} -> {}", u, v))?;
        }
        if !net.is_acyclic() {
            bail!("Model edges contain a cycle");
        }
        Ok(net)
    }

    /// Starting network of the search: required edges and prohibited edges.
    pub fn search_network(&self) -> Result<Network> {
        let mut net = self.empty_network()?;
        for (u, v) in &self.required {
            net.add_edge(u, v)
                .with_context(|| format!("Invalid required edge {} -> {}", u, v))?;
        }
        for (u, v) in &self.prohibited {
            net.prohibit_edge(u, v)
                .with_context(|| format!("Invalid prohibited edge {} -> {}", u, v))?;
        }
        Ok(net)
    }
}

impl RunConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load the explicit file, or the discovered one, or the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = Self::config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Configuration file path (environment variable or current directory)
    pub fn config_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(CONFIG_FILE),
        }
    }

    /// Write the default configuration file, refusing to overwrite.
    pub fn create_default(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        Self::default().save(path)
    }

    /// Check the search parameters and the model.
    pub fn validate(&self) -> Result<()> {
        self.search.validate().context("Invalid [search] section")?;
        self.model.truth_network()?;
        self.model.search_network()?;
        Ok(())
    }
}
