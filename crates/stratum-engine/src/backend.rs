use crate::diagnostics::DiagnosticMode;
use crate::EngineError;
use std::path::PathBuf;
use std::time::Duration;
use stratum_schema::{ClusterIdentity, ProviderConfig};

/// Extra environment variables for an engine child process.
pub type EngineEnv = Vec<(String, String)>;

/// Everything an engine needs for one invocation.
#[derive(Debug, Clone)]
pub struct EngineSpec {
    pub identity: ClusterIdentity,
    pub workspace_dir: PathBuf,
    pub config: ProviderConfig,
    pub timeout: Duration,
    pub diagnostics: DiagnosticMode,
    /// Set by the provider bootstrap hook, e.g. the engine CLI config.
    pub env: EngineEnv,
}

/// Contract of the external infrastructure-as-code engine.
///
/// Every verb runs against `spec.workspace_dir`, must give up once
/// `spec.timeout` has elapsed, and leaves its results as files in the
/// workspace. Callers never retry `apply` or `destroy`.
pub trait EngineBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Install the modules and plugins referenced by the workspace's
    /// module document, which must already be written. Safe to repeat.
    fn init(&self, spec: &EngineSpec) -> Result<(), EngineError>;

    /// Converge real infrastructure toward the materialized configuration.
    fn apply(&self, spec: &EngineSpec) -> Result<(), EngineError>;

    /// Tear down everything recorded in the workspace state artifact.
    fn destroy(&self, spec: &EngineSpec) -> Result<(), EngineError>;
}

pub fn select_backend(name: &str, binary: &str) -> Result<Box<dyn EngineBackend>, EngineError> {
    match name {
        "terraform" | "command" => Ok(Box::new(crate::command::CommandBackend::new(binary))),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(EngineError::BackendUnavailable(other.to_owned())),
    }
}
