//! Engine input files for a workspace.
//!
//! Two files are written: `terraform.tfvars.json` carrying the provider
//! configuration as input variables, and `main.tf.json` declaring those
//! variables, binding them to the provider module, and exposing the
//! connection outputs that `ClusterInfo` is read from.
//!
//! `main.tf.json` must be present before the engine's init verb runs, since
//! init installs the modules and providers it references.

use crate::layout::WorkspaceLayout;
use crate::{atomic_write, StoreError};
use serde_json::{json, Map, Value};
use stratum_schema::cluster::{CA_CERTIFICATE_OUTPUT, ENDPOINT_OUTPUT, KUBECONFIG_OUTPUT};
use stratum_schema::{format_duration, ClusterIdentity, ProviderConfig, Timeouts};
use tracing::debug;

const MODULE_NAME: &str = "cluster";
const CREATE_TIMEOUT_VAR: &str = "create_timeout";
const DELETE_TIMEOUT_VAR: &str = "delete_timeout";

/// Write only `main.tf.json`, the module document the engine initializes from.
pub fn materialize_module(
    layout: &WorkspaceLayout,
    identity: &ClusterIdentity,
    config: &ProviderConfig,
    timeouts: &Timeouts,
    module_source: &str,
) -> Result<(), StoreError> {
    let vars = input_variables(config, timeouts);
    write_main(layout, identity, &vars, module_source)?;
    debug!("wrote module document for {identity} (module: {module_source})");
    Ok(())
}

/// Write the provider configuration into the workspace input files.
pub fn materialize_config(
    layout: &WorkspaceLayout,
    identity: &ClusterIdentity,
    config: &ProviderConfig,
    timeouts: &Timeouts,
    module_source: &str,
) -> Result<(), StoreError> {
    let vars = input_variables(config, timeouts);
    let vars_path = layout.vars_file(identity);
    atomic_write(&vars_path, serde_json::to_string_pretty(&vars)?.as_bytes())?;
    write_main(layout, identity, &vars, module_source)?;

    debug!(
        "materialized {} variables for {identity} (module: {module_source})",
        vars.len()
    );
    Ok(())
}

fn write_main(
    layout: &WorkspaceLayout,
    identity: &ClusterIdentity,
    vars: &Map<String, Value>,
    module_source: &str,
) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(&main_document(vars, module_source))?;
    atomic_write(&layout.main_file(identity), content.as_bytes())
}

fn input_variables(config: &ProviderConfig, timeouts: &Timeouts) -> Map<String, Value> {
    let mut vars: Map<String, Value> = config
        .variables()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    // Explicit values in the config win over the effective timeouts.
    vars.entry(CREATE_TIMEOUT_VAR)
        .or_insert_with(|| Value::String(format_duration(timeouts.apply)));
    vars.entry(DELETE_TIMEOUT_VAR)
        .or_insert_with(|| Value::String(format_duration(timeouts.destroy)));
    vars
}

fn main_document(vars: &Map<String, Value>, module_source: &str) -> Value {
    let declarations: Map<String, Value> =
        vars.keys().map(|k| (k.clone(), json!({}))).collect();

    let mut module = Map::new();
    module.insert("source".to_owned(), Value::String(module_source.to_owned()));
    for key in vars.keys() {
        module.insert(key.clone(), Value::String(format!("${{var.{key}}}")));
    }

    let output = |name: &str, sensitive: bool| {
        json!({
            "value": format!("${{module.{MODULE_NAME}.{name}}}"),
            "sensitive": sensitive,
        })
    };

    json!({
        "variable": declarations,
        "module": { MODULE_NAME: module },
        "output": {
            ENDPOINT_OUTPUT: output(ENDPOINT_OUTPUT, false),
            CA_CERTIFICATE_OUTPUT: output(CA_CERTIFICATE_OUTPUT, true),
            KUBECONFIG_OUTPUT: output(KUBECONFIG_OUTPUT, true),
        },
    })
}
