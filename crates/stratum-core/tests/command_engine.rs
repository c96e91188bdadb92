//! Orchestrator scenarios against a real child process.
//!
//! The fake engine is a shell script run through `sh`. Like the real engine,
//! `init` refuses a workspace without a module document and `apply` refuses
//! a workspace whose modules were never installed. Every invocation appends
//! what it saw to `engine.log` next to the script.

use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use stratum_core::{CoreError, Options, Orchestrator};
use stratum_engine::{CommandBackend, EngineError};
use stratum_schema::{ClusterPhase, Operation, ProviderConfig, ProviderType};

const FAKE_ENGINE: &str = r#"
log="$(dirname "$0")/engine.log"
verb="$1"
if [ -f main.tf.json ]; then main=yes; else main=no; fi
if [ -f terraform.tfvars.json ]; then vars=yes; else vars=no; fi
echo "$verb main=$main vars=$vars cli=${TF_CLI_CONFIG_FILE:-none}" >> "$log"
case "$verb" in
  init)
    [ "$main" = yes ] || { echo "no configuration files" >&2; exit 1; }
    mkdir -p .terraform/modules
    ;;
  apply)
    [ -d .terraform/modules ] || { echo "module not installed" >&2; exit 1; }
    if grep -q '"slow_apply"' terraform.tfvars.json; then sleep 30; fi
    cat > terraform.tfstate <<'STATE'
{"version": 4, "serial": 1, "lineage": "fake",
 "resources": [{"mode": "managed", "type": "fake_cluster", "name": "c"}],
 "outputs": {"endpoint": {"value": "https://fake.example", "type": "string"}}}
STATE
    ;;
  destroy)
    [ -f terraform.tfstate ] || { echo "no state" >&2; exit 1; }
    cat > terraform.tfstate <<'STATE'
{"version": 4, "serial": 2, "lineage": "fake", "resources": [], "outputs": {}}
STATE
    ;;
esac
"#;

struct Harness {
    engine_dir: tempfile::TempDir,
    data_dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let engine_dir = tempfile::tempdir().unwrap();
        std::fs::write(engine_dir.path().join("engine.sh"), FAKE_ENGINE).unwrap();
        Self {
            engine_dir,
            data_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn orchestrator(&self, persistent: bool) -> Orchestrator {
        let script = self.engine_dir.path().join("engine.sh");
        let backend =
            CommandBackend::new("sh").with_base_args([script.to_string_lossy().into_owned()]);
        let opts = Options::new()
            .data_dir(self.data_dir.path())
            .persistent(persistent);
        Orchestrator::with_backend(opts, Box::new(backend))
    }

    fn log(&self) -> Vec<String> {
        std::fs::read_to_string(self.engine_dir.path().join("engine.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn workspace(&self, project: &str, cluster: &str, provider: ProviderType) -> PathBuf {
        self.data_dir
            .path()
            .join(project)
            .join(cluster)
            .join(provider.as_str())
    }
}

fn config(project: &str, cluster: &str) -> ProviderConfig {
    ProviderConfig::new()
        .with("project", project)
        .with("cluster_name", cluster)
        .with("region", "europe-west1")
}

fn cli_config(data_dir: &Path) -> String {
    data_dir.join("engine").join("gardener.tfrc").display().to_string()
}

#[test]
fn init_sees_module_document_on_first_create() {
    let h = Harness::new();
    let orch = h.orchestrator(true);

    let info = orch.create(ProviderType::Gcp, &config("p1", "c1")).unwrap();
    assert_eq!(info.endpoint.as_deref(), Some("https://fake.example"));
    assert_eq!(
        h.log(),
        vec![
            "init main=yes vars=no cli=none",
            "apply main=yes vars=yes cli=none",
        ]
    );
    let ws = h.workspace("p1", "c1", ProviderType::Gcp);
    assert!(ws.join(".terraform/modules").is_dir());
    assert!(ws.join("terraform.tfstate").is_file());
}

#[test]
fn ephemeral_create_then_delete_with_returned_state() {
    let h = Harness::new();
    let orch = h.orchestrator(false);
    let cfg = config("p1", "c1");
    let ws = h.workspace("p1", "c1", ProviderType::Aws);

    let info = orch.create(ProviderType::Aws, &cfg).unwrap();
    assert!(info.state.has_resources());
    assert!(!ws.exists());

    orch.delete(Some(&info.state), ProviderType::Aws, &cfg)
        .unwrap();
    assert!(!ws.exists());
    let log = h.log();
    assert_eq!(log.len(), 4);
    assert_eq!(log[2], "init main=yes vars=no cli=none");
    assert_eq!(log[3], "destroy main=yes vars=yes cli=none");
}

#[test]
fn persistent_delete_destroys_from_workspace_state() {
    let h = Harness::new();
    let orch = h.orchestrator(true);
    let cfg = config("p1", "c1");

    orch.create(ProviderType::Kind, &cfg).unwrap();
    orch.delete(None, ProviderType::Kind, &cfg).unwrap();
    assert_eq!(
        orch.status(None, ProviderType::Kind, &cfg).unwrap().phase,
        ClusterPhase::Unknown
    );
    assert_eq!(h.log().last().unwrap(), "destroy main=yes vars=yes cli=none");
}

#[test]
fn delete_without_state_stops_after_init() {
    let h = Harness::new();
    let orch = h.orchestrator(false);

    let err = orch
        .delete(None, ProviderType::Gcp, &config("p1", "c1"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NoState(_)), "got {err:?}");
    assert_eq!(h.log(), vec!["init main=yes vars=no cli=none"]);
    assert!(!h.workspace("p1", "c1", ProviderType::Gcp).exists());
}

#[test]
fn apply_timeout_kills_engine_and_cleans_workspace() {
    let h = Harness::new();
    let orch = h.orchestrator(false);
    let cfg = config("p1", "c1")
        .with("slow_apply", true)
        .with("timeouts", json!({"apply": 1}));

    let started = Instant::now();
    let err = orch.create(ProviderType::Gcp, &cfg).unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(matches!(
        err,
        CoreError::Engine(EngineError::Timeout {
            op: Operation::Apply,
            ..
        })
    ));
    assert!(!h.workspace("p1", "c1", ProviderType::Gcp).exists());
}

#[test]
fn gardener_engine_receives_cli_config() {
    let h = Harness::new();
    let orch = h.orchestrator(false);

    orch.create(ProviderType::Gardener, &config("garden-dev", "shoot1"))
        .unwrap();
    let expected = cli_config(h.data_dir.path());
    assert_eq!(
        h.log(),
        vec![
            format!("init main=yes vars=no cli={expected}"),
            format!("apply main=yes vars=yes cli={expected}"),
        ]
    );
    let content = std::fs::read_to_string(&expected).unwrap();
    assert!(content.contains("filesystem_mirror"));
}
