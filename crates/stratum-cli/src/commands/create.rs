use super::{json_pretty, load_config, with_spinner, CliError, EXIT_SUCCESS};
use std::io::Write;
use std::path::{Path, PathBuf};
use stratum_core::Orchestrator;
use stratum_schema::{ProviderType, StateArtifact};
use tempfile::NamedTempFile;

fn write_state_file(dest: &Path, state: &StateArtifact) -> Result<(), String> {
    let content = state.to_json_pretty().map_err(|e| e.to_string())?;
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| format!("write temp file: {e}"))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| format!("write temp file: {e}"))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| format!("fsync temp file: {e}"))?;
    tmp.persist(dest)
        .map_err(|e| format!("persist state: {}", e.error))?;
    Ok(())
}

pub fn run(
    orch: &Orchestrator,
    provider: ProviderType,
    config_path: &Path,
    state_out: Option<&Path>,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path)?;
    let info = with_spinner(
        json,
        "creating cluster...",
        "cluster created",
        "create failed",
        || orch.create(provider, &config),
    )?;

    // The cluster exists from here on. Whatever happens to the state file,
    // the state still reaches stdout before any error is returned.
    let store_error = state_out.and_then(|path| {
        write_state_file(path, &info.state).err().map(|e| {
            CliError::state(format!(
                "could not store state into file: {}: {e}",
                path.display()
            ))
        })
    });
    let stored = state_out.filter(|_| store_error.is_none());
    if stored.is_none() && store_error.is_none() && !orch.options().persistent {
        eprintln!(
            "warning: workspace is not persistent and --state-out was not given; \
             the state of {} is only in this output",
            info.identity
        );
    }

    if json {
        let payload = serde_json::json!({
            "cluster": info.identity.to_string(),
            "provider": info.identity.provider,
            "endpoint": info.endpoint,
            "ca_certificate": info.ca_certificate,
            "kubeconfig": info.kubeconfig,
            "outputs": info.outputs,
            "resources": info.state.resource_count(),
            "state_file": stored.map(|p| p.display().to_string()),
            "state": info.state,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("created cluster {}", info.identity);
        if let Some(endpoint) = &info.endpoint {
            println!("endpoint: {endpoint}");
        }
        println!("resources: {}", info.state.resource_count());
        match stored {
            Some(path) => println!("state: {}", path.display()),
            None if !orch.options().persistent || store_error.is_some() => {
                println!("state:\n{}", json_pretty(&info.state)?);
            }
            None => {}
        }
    }

    match store_error {
        Some(e) => Err(e),
        None => Ok(EXIT_SUCCESS),
    }
}
