use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratum_core::{CoreError, Options, Orchestrator};
use stratum_engine::{DiagnosticMode, EngineError, MockBackend, CLI_CONFIG_ENV};
use stratum_schema::{ClusterPhase, Operation, ProviderConfig, ProviderType, StateArtifact};
use stratum_store::{MAIN_FILE, STATE_BACKUP_FILE, STATE_FILE, VARS_FILE};

fn config(project: &str, cluster: &str) -> ProviderConfig {
    ProviderConfig::new()
        .with("project", project)
        .with("cluster_name", cluster)
        .with("region", "europe-west1")
}

fn orchestrator(data_dir: &Path, persistent: bool) -> (Orchestrator, MockBackend) {
    let mock = MockBackend::new();
    let opts = Options::new().data_dir(data_dir).persistent(persistent);
    (
        Orchestrator::with_backend(opts, Box::new(mock.clone())),
        mock,
    )
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn workspace(data_dir: &Path, project: &str, cluster: &str, provider: ProviderType) -> PathBuf {
    data_dir.join(project).join(cluster).join(provider.as_str())
}

#[test]
fn create_returns_cluster_info_and_removes_ephemeral_workspace() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);

    let info = orch.create(ProviderType::Gcp, &config("p1", "c1")).unwrap();
    assert_eq!(info.identity.to_string(), "p1/c1/gcp");
    assert_eq!(info.endpoint.as_deref(), Some("https://api.c1.p1.mock"));
    assert!(info.ca_certificate.is_some());
    assert!(info.kubeconfig.is_some());
    assert!(info.state.has_resources());

    let ops: Vec<_> = mock.calls().iter().map(|c| c.op).collect();
    assert_eq!(ops, vec![Operation::Init, Operation::Apply]);
    assert!(
        !workspace(data.path(), "p1", "c1", ProviderType::Gcp).exists(),
        "ephemeral workspace must be removed"
    );
}

#[test]
fn persistent_workspace_keeps_inputs_and_state() {
    let data = tempfile::tempdir().unwrap();
    let (orch, _mock) = orchestrator(data.path(), true);
    let cfg = config("p1", "c1");

    orch.create(ProviderType::Aws, &cfg).unwrap();

    let ws = data.path().join("p1").join("c1").join("aws");
    assert!(ws.join(STATE_FILE).is_file());
    let vars: serde_json::Value =
        serde_json::from_slice(&std::fs::read(ws.join(VARS_FILE)).unwrap()).unwrap();
    assert_eq!(vars["region"], json!("europe-west1"));
    assert_eq!(vars["create_timeout"], json!("1h"));
    assert_eq!(vars["delete_timeout"], json!("1h"));
}

#[test]
fn persistent_lifecycle_create_status_delete() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), true);
    let cfg = config("p1", "c1");

    orch.create(ProviderType::Kind, &cfg).unwrap();
    let status = orch.status(None, ProviderType::Kind, &cfg).unwrap();
    assert_eq!(status.phase, ClusterPhase::Provisioned);

    orch.delete(None, ProviderType::Kind, &cfg).unwrap();
    let destroy = &mock.calls_for(Operation::Destroy)[0];
    assert!(destroy.state_present);
    assert_eq!(destroy.state_resources, 1);

    let status = orch.status(None, ProviderType::Kind, &cfg).unwrap();
    assert_eq!(status.phase, ClusterPhase::Unknown);
}

#[test]
fn delete_without_state_never_invokes_destroy() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);

    let err = orch
        .delete(None, ProviderType::Gcp, &config("p1", "c1"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NoState(_)), "got {err:?}");
    assert!(err
        .to_string()
        .starts_with("no state provided, attempted to load from file"));
    assert!(mock.calls_for(Operation::Destroy).is_empty());
    assert!(!workspace(data.path(), "p1", "c1", ProviderType::Gcp).exists());
}

#[test]
fn delete_persists_supplied_state_before_destroy() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);
    let cfg = config("p1", "c1");

    let ws = workspace(data.path(), "p1", "c1", ProviderType::Azure);
    let info = orch.create(ProviderType::Azure, &cfg).unwrap();
    assert!(!ws.exists());

    orch.delete(Some(&info.state), ProviderType::Azure, &cfg)
        .unwrap();
    let destroy = &mock.calls_for(Operation::Destroy)[0];
    assert!(destroy.state_present);
    assert_eq!(destroy.state_resources, 1);
    assert!(!ws.exists());
}

#[test]
fn supplied_state_replaces_disk_state_with_backup() {
    let data = tempfile::tempdir().unwrap();
    let (orch, _mock) = orchestrator(data.path(), true);
    let cfg = config("p1", "c1");
    orch.create(ProviderType::Aws, &cfg).unwrap();

    let supplied = StateArtifact::from_value(json!({
        "version": 4,
        "serial": 7,
        "lineage": "external",
        "resources": [{"type": "aws_eks_cluster"}, {"type": "aws_iam_role"}]
    }))
    .unwrap();
    orch.delete(Some(&supplied), ProviderType::Aws, &cfg).unwrap();

    let ws = data.path().join("p1").join("c1").join("aws");
    let backup =
        StateArtifact::from_slice(&std::fs::read(ws.join(STATE_BACKUP_FILE)).unwrap()).unwrap();
    assert_eq!(backup.lineage(), Some("mock-p1/c1/aws"));
}

#[test]
fn status_uses_supplied_state_without_touching_disk() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);
    let cfg = config("p1", "c1");

    let empty = StateArtifact::from_value(json!({"resources": []})).unwrap();
    let owned = StateArtifact::from_value(json!({"resources": [{"type": "x"}]})).unwrap();
    assert_eq!(
        orch.status(Some(&empty), ProviderType::Gcp, &cfg)
            .unwrap()
            .phase,
        ClusterPhase::Unknown
    );
    assert_eq!(
        orch.status(Some(&owned), ProviderType::Gcp, &cfg)
            .unwrap()
            .phase,
        ClusterPhase::Provisioned
    );
    assert!(mock.calls().is_empty());
    assert!(is_empty_dir(data.path()));
}

#[test]
fn status_without_any_state_is_an_error() {
    let data = tempfile::tempdir().unwrap();
    let (orch, _mock) = orchestrator(data.path(), false);
    let err = orch
        .status(None, ProviderType::Gcp, &config("p1", "c1"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NoState(_)));
    assert!(is_empty_dir(data.path()));
}

#[test]
fn apply_timeout_is_surfaced_and_workspace_cleaned() {
    let data = tempfile::tempdir().unwrap();
    let mock = MockBackend::new().with_delay(Operation::Apply, Duration::from_secs(60));
    let orch = Orchestrator::with_backend(
        Options::new().data_dir(data.path()),
        Box::new(mock.clone()),
    );
    let cfg = config("p1", "c1").with("timeouts", json!({"apply": 1}));

    let err = orch.create(ProviderType::Gcp, &cfg).unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
    assert!(matches!(
        err,
        CoreError::Engine(EngineError::Timeout {
            op: Operation::Apply,
            ..
        })
    ));
    assert_eq!(
        mock.calls_for(Operation::Apply)[0].timeout,
        Duration::from_secs(1)
    );
    assert!(!workspace(data.path(), "p1", "c1", ProviderType::Gcp).exists());
}

#[test]
fn failed_apply_is_not_rolled_back() {
    let data = tempfile::tempdir().unwrap();
    let mock = MockBackend::new().fail_on(Operation::Apply);
    let orch = Orchestrator::with_backend(
        Options::new().data_dir(data.path()),
        Box::new(mock.clone()),
    );

    let err = orch
        .create(ProviderType::Aws, &config("p1", "c1"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Engine(EngineError::Failed { .. })));
    assert!(mock.calls_for(Operation::Destroy).is_empty());
    assert!(!workspace(data.path(), "p1", "c1", ProviderType::Aws).exists());
}

#[test]
fn failed_init_stops_before_apply() {
    let data = tempfile::tempdir().unwrap();
    let mock = MockBackend::new().fail_on(Operation::Init);
    let orch = Orchestrator::with_backend(
        Options::new().data_dir(data.path()).persistent(true),
        Box::new(mock.clone()),
    );

    assert!(orch.create(ProviderType::Kind, &config("p1", "c1")).is_err());
    assert!(mock.calls_for(Operation::Apply).is_empty());
    let ws = workspace(data.path(), "p1", "c1", ProviderType::Kind);
    assert!(ws.is_dir(), "persistent workspace survives failure");
    assert!(ws.join(MAIN_FILE).is_file(), "module document precedes init");
    assert!(!ws.join(VARS_FILE).exists());
}

#[test]
fn gardener_engine_runs_with_bootstrapped_cli_config() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);
    orch.create(ProviderType::Gardener, &config("garden-dev", "shoot1"))
        .unwrap();
    orch.create(ProviderType::Gardener, &config("garden-dev", "shoot2"))
        .unwrap();

    let cli_config = orch.layout().engine_dir().join("gardener.tfrc");
    assert!(cli_config.is_file());
    let expected = vec![(CLI_CONFIG_ENV.to_owned(), cli_config.display().to_string())];
    let calls = mock.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.env == expected));

    // Other providers run without it.
    orch.create(ProviderType::Gcp, &config("p1", "c1")).unwrap();
    assert!(mock.calls_for(Operation::Apply)[2].env.is_empty());
}

#[test]
fn missing_identity_key_is_a_config_error() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);
    let cfg = ProviderConfig::new().with("project", "p1");

    let err = orch.create(ProviderType::Gcp, &cfg).unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));
    assert!(err.to_string().contains("cluster_name"));
    assert!(mock.calls().is_empty());
}

#[test]
fn path_traversal_in_identity_is_rejected() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), true);
    let cfg = config("..", "c1");
    assert!(matches!(
        orch.create(ProviderType::Gcp, &cfg),
        Err(CoreError::Config(_))
    ));
    assert!(mock.calls().is_empty());
    assert!(is_empty_dir(data.path()));
}

#[test]
fn diagnostics_follow_verbose_option() {
    let data = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let orch = Orchestrator::with_backend(
        Options::new().data_dir(data.path()).verbose(true),
        Box::new(mock.clone()),
    );
    orch.create(ProviderType::Kind, &config("p1", "c1")).unwrap();
    assert!(mock
        .calls()
        .iter()
        .all(|c| c.diagnostics == DiagnosticMode::Inherit));

    let (quiet, quiet_mock) = orchestrator(data.path(), false);
    quiet.create(ProviderType::Kind, &config("p1", "c1")).unwrap();
    assert!(quiet_mock
        .calls()
        .iter()
        .all(|c| c.diagnostics == DiagnosticMode::Suppressed));
}

#[test]
fn distinct_identities_run_concurrently() {
    let data = tempfile::tempdir().unwrap();
    let (orch, mock) = orchestrator(data.path(), false);
    let providers = [
        ProviderType::Gcp,
        ProviderType::Aws,
        ProviderType::Azure,
        ProviderType::Kind,
    ];

    // Same project throughout, and the same cluster for several providers.
    std::thread::scope(|s| {
        for cluster in ["a", "b"] {
            for provider in providers {
                let orch = &orch;
                s.spawn(move || {
                    for _ in 0..25 {
                        let info = orch.create(provider, &config("shared", cluster)).unwrap();
                        assert_eq!(info.identity.cluster_name, cluster);
                    }
                });
            }
        }
    });

    assert_eq!(mock.calls_for(Operation::Apply).len(), 200);
    for cluster in ["a", "b"] {
        for provider in providers {
            assert!(!workspace(data.path(), "shared", cluster, provider).exists());
        }
    }
}
