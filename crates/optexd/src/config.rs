//! optex.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use optex_state::{DEFAULT_SLUG, Scope};

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "optex.redb";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptexConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub builtin: BuiltinConfig,
    /// Stored metrics declared up front.
    #[serde(rename = "metric")]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// Plugin slug embedded in option names.
    pub slug: String,
    pub scope: Scope,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/optex"),
            slug: DEFAULT_SLUG.to_string(),
            scope: Scope::Site,
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuiltinConfig {
    pub enabled: bool,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub name: String,
    pub help: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub has_timestamp: bool,
}

impl OptexConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: OptexConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
