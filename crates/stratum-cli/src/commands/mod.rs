pub mod completions;
pub mod create;
pub mod delete;
pub mod doctor;
pub mod status;

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use stratum_core::CoreError;
use stratum_schema::{ProviderConfig, StateArtifact};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STATE_ERROR: u8 = 3;

/// A failed command: the message for stderr and the process exit code.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::new(EXIT_STATE_ERROR, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        Self::new(EXIT_FAILURE, message)
    }
}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        let code = match &e {
            CoreError::Config(_) | CoreError::Options { .. } => EXIT_CONFIG_ERROR,
            CoreError::Workspace(_)
            | CoreError::ClusterData(_)
            | CoreError::NoState(_)
            | CoreError::StoreState(_)
            | CoreError::ClusterInfo(_) => EXIT_STATE_ERROR,
            CoreError::ProviderInit(_)
            | CoreError::Engine(_)
            | CoreError::InvalidTransition { .. } => EXIT_FAILURE,
        };
        Self::new(code, e.to_string())
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_phase(phase: &str) -> String {
    use console::Style;
    match phase {
        "provisioned" => Style::new().green().apply_to(phase).to_string(),
        "unknown" => Style::new().yellow().apply_to(phase).to_string(),
        other => other.to_owned(),
    }
}

/// Load a provider config, reporting failures as configuration errors.
pub fn load_config(path: &Path) -> Result<ProviderConfig, CliError> {
    ProviderConfig::load(path).map_err(|e| CoreError::from(e).into())
}

pub fn load_state(path: &Path) -> Result<StateArtifact, CliError> {
    let unreadable = |e: &dyn fmt::Display| {
        CliError::state(format!("failed to read state file '{}': {e}", path.display()))
    };
    let bytes = std::fs::read(path).map_err(|e| unreadable(&e))?;
    StateArtifact::from_slice(&bytes).map_err(|e| unreadable(&e))
}

/// Run `op` behind a spinner unless JSON output is requested.
pub fn with_spinner<T, E: Into<CliError>>(
    json: bool,
    running: &str,
    done: &str,
    failed: &str,
    op: impl FnOnce() -> Result<T, E>,
) -> Result<T, CliError> {
    let pb = if json { None } else { Some(spinner(running)) };
    match op() {
        Ok(v) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, done);
            }
            Ok(v)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, failed);
            }
            Err(e.into())
        }
    }
}
