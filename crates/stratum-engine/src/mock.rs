use crate::backend::{EngineBackend, EngineSpec};
use crate::diagnostics::DiagnosticMode;
use crate::EngineError;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stratum_schema::{ClusterIdentity, Operation, StateArtifact};
use stratum_store::{ENGINE_DIR, MAIN_FILE, STATE_FILE, VARS_FILE};

/// One recorded engine invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub op: Operation,
    pub identity: ClusterIdentity,
    pub workspace_dir: PathBuf,
    pub timeout: Duration,
    pub diagnostics: DiagnosticMode,
    /// Whether a state artifact was present in the workspace when the call began.
    pub state_present: bool,
    /// Resources in that artifact.
    pub state_resources: usize,
    pub env: Vec<(String, String)>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    failures: HashSet<Operation>,
    delays: HashMap<Operation, Duration>,
}

/// In-process engine honouring the same file contract as the real one.
///
/// `init` requires the module document, `apply` requires the variables file
/// and writes a state artifact owning one resource plus connection
/// outputs; `destroy` requires a state artifact and rewrites it with no
/// resources. Clones share their call log, so a test can keep a handle
/// while the orchestrator owns the boxed backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `op` fail.
    #[must_use]
    pub fn fail_on(self, op: Operation) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failures.insert(op);
        }
        self
    }

    /// Make every invocation of `op` take `delay` (bounded by `EngineSpec::timeout`).
    #[must_use]
    pub fn with_delay(self, op: Operation, delay: Duration) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.delays.insert(op, delay);
        }
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_for(&self, op: Operation) -> Vec<MockCall> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    fn existing_state(spec: &EngineSpec) -> Option<StateArtifact> {
        let bytes = std::fs::read(spec.workspace_dir.join(STATE_FILE)).ok()?;
        StateArtifact::from_slice(&bytes).ok()
    }

    /// Record the call, then apply the configured delay and failure.
    fn invoke(&self, op: Operation, spec: &EngineSpec) -> Result<(), EngineError> {
        let existing = Self::existing_state(spec);
        let (fail, delay) = {
            let mut state = self.state.lock().map_err(|e| EngineError::Failed {
                op,
                detail: format!("mutex poisoned: {e}"),
            })?;
            state.calls.push(MockCall {
                op,
                identity: spec.identity.clone(),
                workspace_dir: spec.workspace_dir.clone(),
                timeout: spec.timeout,
                diagnostics: spec.diagnostics,
                state_present: existing.is_some(),
                state_resources: existing.as_ref().map_or(0, StateArtifact::resource_count),
                env: spec.env.clone(),
            });
            (state.failures.contains(&op), state.delays.get(&op).copied())
        };

        if let Some(delay) = delay {
            if delay > spec.timeout {
                std::thread::sleep(spec.timeout);
                return Err(EngineError::Timeout {
                    op,
                    timeout: spec.timeout,
                });
            }
            std::thread::sleep(delay);
        }
        if fail {
            return Err(EngineError::Failed {
                op,
                detail: "mock failure".to_owned(),
            });
        }
        Ok(())
    }

    fn write_state(op: Operation, spec: &EngineSpec, resources: usize) -> Result<(), EngineError> {
        let serial = Self::existing_state(spec)
            .and_then(|s| s.serial())
            .unwrap_or(0)
            + 1;
        let id = &spec.identity;
        let resources: Vec<_> = (0..resources)
            .map(|_| json!({"mode": "managed", "type": "mock_cluster", "name": id.cluster_name}))
            .collect();
        let outputs = if resources.is_empty() {
            json!({})
        } else {
            json!({
                "endpoint": {
                    "value": format!("https://api.{}.{}.mock", id.cluster_name, id.project),
                    "type": "string"
                },
                "ca_certificate": {"value": "bW9jay1jYQ==", "type": "string", "sensitive": true},
                "kubeconfig": {
                    "value": format!(
                        "apiVersion: v1\nkind: Config\ncurrent-context: {}\n",
                        id.cluster_name
                    ),
                    "type": "string",
                    "sensitive": true
                }
            })
        };
        let doc = json!({
            "version": 4,
            "serial": serial,
            "lineage": format!("mock-{id}"),
            "resources": resources,
            "outputs": outputs,
        });
        let content = serde_json::to_string_pretty(&doc).map_err(|e| EngineError::Failed {
            op,
            detail: format!("could not encode state: {e}"),
        })?;
        std::fs::write(spec.workspace_dir.join(STATE_FILE), content)?;
        Ok(())
    }
}

impl EngineBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn init(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.invoke(Operation::Init, spec)?;
        if !spec.workspace_dir.join(MAIN_FILE).is_file() {
            return Err(EngineError::Failed {
                op: Operation::Init,
                detail: format!("no {MAIN_FILE} in workspace"),
            });
        }
        std::fs::create_dir_all(spec.workspace_dir.join(ENGINE_DIR))?;
        Ok(())
    }

    fn apply(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.invoke(Operation::Apply, spec)?;
        if !spec.workspace_dir.join(VARS_FILE).is_file() {
            return Err(EngineError::Failed {
                op: Operation::Apply,
                detail: format!("no {VARS_FILE} in workspace"),
            });
        }
        Self::write_state(Operation::Apply, spec, 1)
    }

    fn destroy(&self, spec: &EngineSpec) -> Result<(), EngineError> {
        self.invoke(Operation::Destroy, spec)?;
        if Self::existing_state(spec).is_none() {
            return Err(EngineError::Failed {
                op: Operation::Destroy,
                detail: "no state to destroy".to_owned(),
            });
        }
        Self::write_state(Operation::Destroy, spec, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use stratum_schema::{ProviderConfig, ProviderType};

    fn spec(dir: &Path) -> EngineSpec {
        EngineSpec {
            identity: ClusterIdentity::new("p1", "c1", ProviderType::Gcp).unwrap(),
            workspace_dir: dir.to_path_buf(),
            config: ProviderConfig::new(),
            timeout: Duration::from_secs(5),
            diagnostics: DiagnosticMode::Suppressed,
            env: Vec::new(),
        }
    }

    fn read_state(dir: &Path) -> StateArtifact {
        StateArtifact::from_slice(&std::fs::read(dir.join(STATE_FILE)).unwrap()).unwrap()
    }

    #[test]
    fn mock_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let spec = spec(dir.path());

        std::fs::write(dir.path().join(MAIN_FILE), "{}").unwrap();
        backend.init(&spec).unwrap();
        assert!(dir.path().join(ENGINE_DIR).is_dir());

        std::fs::write(dir.path().join(VARS_FILE), "{}").unwrap();
        backend.apply(&spec).unwrap();
        let state = read_state(dir.path());
        assert!(state.has_resources());
        assert_eq!(state.serial(), Some(1));
        assert_eq!(
            state.outputs()["endpoint"],
            json!("https://api.c1.p1.mock")
        );

        backend.destroy(&spec).unwrap();
        let state = read_state(dir.path());
        assert!(!state.has_resources());
        assert_eq!(state.serial(), Some(2));

        let destroy = &backend.calls_for(Operation::Destroy)[0];
        assert!(destroy.state_present);
        assert_eq!(destroy.state_resources, 1);
        assert_eq!(backend.calls().len(), 3);
    }

    #[test]
    fn init_requires_module_document() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let err = backend.init(&spec(dir.path())).unwrap_err();
        assert!(err.to_string().contains(MAIN_FILE));
        assert!(!dir.path().join(ENGINE_DIR).exists());
        assert_eq!(backend.calls_for(Operation::Init).len(), 1);
    }

    #[test]
    fn apply_requires_materialized_variables() {
        let dir = tempfile::tempdir().unwrap();
        let err = MockBackend::new().apply(&spec(dir.path())).unwrap_err();
        assert!(err.to_string().contains(VARS_FILE));
    }

    #[test]
    fn destroy_without_state_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        assert!(backend.destroy(&spec(dir.path())).is_err());
        assert!(!backend.calls()[0].state_present);
    }

    #[test]
    fn injected_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new().fail_on(Operation::Init);
        let err = backend.init(&spec(dir.path())).unwrap_err();
        assert!(matches!(err, EngineError::Failed { op: Operation::Init, .. }));
    }

    #[test]
    fn delay_beyond_timeout_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new().with_delay(Operation::Apply, Duration::from_secs(60));
        let mut spec = spec(dir.path());
        spec.timeout = Duration::from_millis(50);
        std::fs::write(dir.path().join(VARS_FILE), "{}").unwrap();
        let err = backend.apply(&spec).unwrap_err();
        assert!(err.is_timeout());
        assert!(!dir.path().join(STATE_FILE).exists());
    }

    #[test]
    fn clones_share_call_log() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let handle = backend.clone();
        std::fs::write(dir.path().join(MAIN_FILE), "{}").unwrap();
        backend.init(&spec(dir.path())).unwrap();
        assert_eq!(handle.calls_for(Operation::Init).len(), 1);
    }
}
