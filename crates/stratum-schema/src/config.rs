use crate::identity::ClusterIdentity;
use crate::provider::ProviderType;
use crate::timeouts::{parse_timeout_table, Operation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const PROJECT_KEY: &str = "project";
pub const CLUSTER_NAME_KEY: &str = "cluster_name";
pub const TIMEOUTS_KEY: &str = "timeouts";
pub const MODULE_SOURCE_KEY: &str = "module_source";

/// Keys interpreted by Stratum itself and never handed to the engine as variables.
pub const RESERVED_KEYS: [&str; 2] = [TIMEOUTS_KEY, MODULE_SOURCE_KEY];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read provider config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse provider config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse provider config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("unsupported provider config format '{0}', expected .toml or .json")]
    UnsupportedFormat(String),
    #[error("provider config must be a table of keys")]
    NotATable,
    #[error("missing required key '{0}'")]
    MissingKey(String),
    #[error("invalid value for '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Provider configuration supplied by the caller.
///
/// Apart from the identity keys and the reserved keys, the content is opaque
/// and passed through to the engine unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig {
    entries: Map<String, Value>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(ConfigError::NotATable),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let entries: Map<String, Value> = toml::from_str(s)?;
        Ok(Self { entries })
    }

    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_owned(),
            )),
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.entries.get(key) {
            None => Err(ConfigError::MissingKey(key.to_owned())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ConfigError::InvalidKey {
                key: key.to_owned(),
                reason: "must be a string".to_owned(),
            }),
        }
    }

    /// Derive the cluster identity from the `project` and `cluster_name` keys.
    pub fn identity(&self, provider: ProviderType) -> Result<ClusterIdentity, ConfigError> {
        let project = self.get_str(PROJECT_KEY)?;
        let cluster_name = self.get_str(CLUSTER_NAME_KEY)?;
        ClusterIdentity::new(project, cluster_name, provider)
    }

    /// Timeouts requested by the `timeouts` table, if present.
    pub fn timeout_overrides(&self) -> Result<BTreeMap<Operation, Duration>, ConfigError> {
        match self.entries.get(TIMEOUTS_KEY) {
            None => Ok(BTreeMap::new()),
            Some(Value::Object(table)) => parse_timeout_table(TIMEOUTS_KEY, table),
            Some(_) => Err(ConfigError::InvalidKey {
                key: TIMEOUTS_KEY.to_owned(),
                reason: "must be a table of operation = duration".to_owned(),
            }),
        }
    }

    pub fn module_source(&self) -> Result<Option<&str>, ConfigError> {
        if self.entries.contains_key(MODULE_SOURCE_KEY) {
            self.get_str(MODULE_SOURCE_KEY).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Entries handed to the engine as input variables, in key order.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
    }
}
