use super::{colorize_phase, json_pretty, load_config, load_state, CliError, EXIT_SUCCESS};
use std::path::Path;
use stratum_core::{CoreError, Orchestrator};
use stratum_schema::{ClusterStatus, ProviderType};

pub fn run(
    orch: &Orchestrator,
    provider: ProviderType,
    config_path: &Path,
    state_path: Option<&Path>,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path)?;
    let identity = config.identity(provider).map_err(CoreError::from)?;
    let state = state_path.map(load_state).transpose()?;

    let (status, error) = match orch.status(state.as_ref(), provider, &config) {
        Ok(status) => (status, None),
        Err(e) => (ClusterStatus::UNKNOWN, Some(e)),
    };

    if json {
        let payload = serde_json::json!({
            "cluster": identity.to_string(),
            "phase": status.phase,
            "error": error.as_ref().map(ToString::to_string),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{identity}: {}",
            colorize_phase(&status.phase.to_string())
        );
    }

    match error {
        Some(e) => Err(e.into()),
        None => Ok(EXIT_SUCCESS),
    }
}
