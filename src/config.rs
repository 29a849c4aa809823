use crate::validator::ValidationPolicy;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "ecodata";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repository layout
pub const INBOX_DIR: &str = "00_inbox";
pub const PROJECTS_DIR: &str = "01_projects";
pub const METADATA_DIR: &str = "metadata";

/// Files under `metadata/`
pub const REGISTRY_FILE: &str = "projects.csv";
pub const INDEX_FILE: &str = "inbox_mapping.csv";
pub const POLICY_FILE: &str = "policy.json";

/// Log filter when neither RUST_LOG nor -v is given
pub const DEFAULT_LOG_FILTER: &str = "warn,ecodata_filing=info";

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub policy: ValidationPolicy,
}

impl Config {
    /// Load configuration for a repository root
    ///
    /// `policy_path` overrides `metadata/policy.json`; a missing default
    /// policy file means default policy, a missing explicit one is an error.
    pub fn load(root: impl Into<PathBuf>, policy_path: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let policy = match policy_path {
            Some(path) => load_policy(path)?,
            None => {
                let default_path = root.join(METADATA_DIR).join(POLICY_FILE);
                if default_path.exists() {
                    load_policy(&default_path)?
                } else {
                    ValidationPolicy::default()
                }
            }
        };

        Ok(Config { root, policy })
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.root.join(INBOX_DIR)
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.metadata_dir().join(REGISTRY_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.metadata_dir().join(INDEX_FILE)
    }
}

fn load_policy(path: &Path) -> Result<ValidationPolicy> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse policy file: {}", path.display()))
}
