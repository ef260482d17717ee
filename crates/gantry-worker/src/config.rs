//! Worker configuration.

use gantry_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Worker configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker name (must be unique across the fleet).
    pub name: String,
    /// Project the checkout tooling operates on.
    #[serde(default = "default_project")]
    pub project: String,
    /// Directory holding the external checkout scripts.
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,
    /// Root directory checkouts land under.
    #[serde(default = "default_checkout_root")]
    pub checkout_root: PathBuf,
    /// Lines buffered before a ledger flush.
    #[serde(default = "default_batch_size")]
    pub log_batch_size: usize,
    /// Optional local mirror of appended log batches.
    #[serde(default)]
    pub log_mirror_dir: Option<PathBuf>,
}

fn default_project() -> String {
    "nova".to_string()
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from("/srv/ci-tools")
}

fn default_checkout_root() -> PathBuf {
    PathBuf::from("/srv/git-checkouts")
}

fn default_batch_size() -> usize {
    100
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "gantry-worker".to_string(),
            project: default_project(),
            tools_dir: default_tools_dir(),
            checkout_root: default_checkout_root(),
            log_batch_size: default_batch_size(),
            log_mirror_dir: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| Error::Serialization(e.to_string()))
    }
}
