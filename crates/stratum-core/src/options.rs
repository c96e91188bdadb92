use crate::CoreError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratum_schema::{parse_timeout_table, Operation, Timeouts};

pub const DEFAULT_BACKEND: &str = "terraform";
pub const DEFAULT_ENGINE_BINARY: &str = "terraform";
const DATA_DIR_NAME: &str = ".stratum";

/// Orchestrator settings, fixed at construction.
///
/// Timeouts set here are defaults; a provider config's `timeouts` table
/// overrides them per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Show the engine's own output instead of discarding it.
    pub verbose: bool,
    /// Keep workspaces after each operation.
    pub persistent: bool,
    pub data_dir: PathBuf,
    pub timeouts: Timeouts,
    pub backend: String,
    pub engine_binary: String,
    /// Where provider modules live when the config has no `module_source`.
    /// Defaults to `<data_dir>/modules`.
    pub modules_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: false,
            persistent: false,
            data_dir: default_data_dir(),
            timeouts: Timeouts::default(),
            backend: DEFAULT_BACKEND.to_owned(),
            engine_binary: DEFAULT_ENGINE_BINARY.to_owned(),
            modules_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    verbose: Option<bool>,
    persistent: Option<bool>,
    data_dir: Option<PathBuf>,
    backend: Option<String>,
    engine_binary: Option<String>,
    modules_dir: Option<PathBuf>,
    timeouts: serde_json::Map<String, serde_json::Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, op: Operation, timeout: Duration) -> Self {
        self.timeouts.set(op, timeout);
        self
    }

    #[must_use]
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = name.into();
        self
    }

    #[must_use]
    pub fn engine_binary(mut self, binary: impl Into<String>) -> Self {
        self.engine_binary = binary.into();
        self
    }

    #[must_use]
    pub fn modules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.modules_dir = Some(dir.into());
        self
    }

    /// Directory holding provider modules.
    pub fn effective_modules_dir(&self) -> PathBuf {
        self.modules_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("modules"))
    }

    /// Load options from a TOML file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::Options {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let file: OptionsFile = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        let overrides =
            parse_timeout_table("timeouts", &file.timeouts).map_err(|e| invalid(e.to_string()))?;

        let defaults = Self::default();
        Ok(Self {
            verbose: file.verbose.unwrap_or(defaults.verbose),
            persistent: file.persistent.unwrap_or(defaults.persistent),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            timeouts: defaults.timeouts.merged(&overrides),
            backend: file.backend.unwrap_or(defaults.backend),
            engine_binary: file.engine_binary.unwrap_or(defaults.engine_binary),
            modules_dir: file.modules_dir,
        })
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(DATA_DIR_NAME),
        |home| PathBuf::from(home).join(DATA_DIR_NAME),
    )
}
