//! Provider bootstrap hook.
//!
//! Some providers need setup shared by every workspace before the engine can
//! initialize one. Gardener's provider plugin is not served by the public
//! registry, so bootstrap writes an engine CLI config that installs it from a
//! local filesystem mirror, and hands back the environment that points the
//! engine at that config. Repeated calls leave the same files in place.

use crate::backend::EngineEnv;
use crate::EngineError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use stratum_schema::ProviderType;
use stratum_store::atomic_write;
use tracing::{debug, info};

/// Environment variable the engine reads its CLI configuration from.
pub const CLI_CONFIG_ENV: &str = "TF_CLI_CONFIG_FILE";

const MIRROR_DIR: &str = "plugins";

fn plugin_source(provider: ProviderType) -> Option<&'static str> {
    match provider {
        ProviderType::Gardener => Some("registry.terraform.io/kyma-incubator/gardener"),
        _ => None,
    }
}

pub fn cli_config_path(engine_dir: &Path, provider: ProviderType) -> PathBuf {
    engine_dir.join(format!("{provider}.tfrc"))
}

/// Local mirror the engine installs bootstrapped plugins from.
pub fn plugin_mirror_dir(engine_dir: &Path) -> PathBuf {
    engine_dir.join(MIRROR_DIR)
}

/// Run the pre-init step for `provider` under `engine_dir`.
///
/// Returns the environment every engine invocation for this provider must
/// carry; empty for providers without a bootstrap step.
pub fn prepare_provider(
    provider: ProviderType,
    engine_dir: &Path,
) -> Result<EngineEnv, EngineError> {
    let Some(source) = plugin_source(provider) else {
        return Ok(EngineEnv::new());
    };

    let mirror = plugin_mirror_dir(engine_dir);
    std::fs::create_dir_all(&mirror).map_err(|e| {
        EngineError::Bootstrap(format!(
            "could not create plugin mirror {}: {e}",
            mirror.display()
        ))
    })?;

    let config_path = cli_config_path(engine_dir, provider);
    let content = cli_config(&mirror, source);
    if std::fs::read_to_string(&config_path).is_ok_and(|current| current == content) {
        debug!("{provider} provider plugin already registered");
    } else {
        atomic_write(&config_path, content.as_bytes()).map_err(|e| {
            EngineError::Bootstrap(format!(
                "could not write {}: {e}",
                config_path.display()
            ))
        })?;
        info!(
            "registered {provider} provider plugin mirror {}",
            mirror.display()
        );
    }

    Ok(vec![(
        CLI_CONFIG_ENV.to_owned(),
        config_path.display().to_string(),
    )])
}

fn cli_config(mirror: &Path, source: &str) -> String {
    // JSON string quoting is valid HCL string quoting.
    let path = Value::String(mirror.display().to_string());
    let source = Value::String(source.to_owned());
    format!(
        "provider_installation {{\n  \
           filesystem_mirror {{\n    \
             path    = {path}\n    \
             include = [{source}]\n  \
           }}\n  \
           direct {{\n    \
             exclude = [{source}]\n  \
           }}\n\
         }}\n"
    )
}
