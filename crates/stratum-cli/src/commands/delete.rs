use super::{json_pretty, load_config, load_state, with_spinner, CliError, EXIT_SUCCESS};
use std::path::Path;
use stratum_core::Orchestrator;
use stratum_schema::ProviderType;

pub fn run(
    orch: &Orchestrator,
    provider: ProviderType,
    config_path: &Path,
    state_path: Option<&Path>,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path)?;
    let state = state_path.map(load_state).transpose()?;

    with_spinner(
        json,
        "deleting cluster...",
        "cluster deleted",
        "delete failed",
        || orch.delete(state.as_ref(), provider, &config),
    )?;

    let cluster = config
        .identity(provider)
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    if json {
        let payload = serde_json::json!({
            "cluster": cluster,
            "status": "deleted",
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("deleted cluster {cluster}");
    }
    Ok(EXIT_SUCCESS)
}
