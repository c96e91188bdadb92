use crate::lifecycle::{Lifecycle, Phase};
use crate::options::Options;
use crate::CoreError;
use stratum_engine::{
    prepare_provider, select_backend, DiagnosticScope, EngineBackend, EngineEnv, EngineSpec,
};
use stratum_schema::{
    ClusterIdentity, ClusterInfo, ClusterStatus, Operation, ProviderConfig, ProviderType,
    StateArtifact, Timeouts,
};
use stratum_store::{
    materialize_config, materialize_module, StateStore, Workspace, WorkspaceLayout,
};
use tracing::{debug, info};

/// Central entry point for cluster lifecycle operations.
///
/// Each operation runs synchronously on the caller's thread and drives the
/// engine through a fresh or existing workspace under `data_dir`. No locking
/// is performed: callers must not run operations on the same
/// (project, cluster, provider) identity concurrently. Operations on
/// distinct identities use distinct workspaces and may run side by side,
/// including identities under the same project or cluster.
pub struct Orchestrator {
    options: Options,
    layout: WorkspaceLayout,
    state_store: StateStore,
    backend: Box<dyn EngineBackend>,
}

/// Everything held open while a create or delete runs.
///
/// Fields drop in declaration order, so the workspace is removed last,
/// after the operation's result has been produced.
struct Session<'a> {
    lifecycle: Lifecycle,
    identity: ClusterIdentity,
    timeouts: Timeouts,
    config: &'a ProviderConfig,
    env: EngineEnv,
    diagnostics: DiagnosticScope,
    workspace: Workspace,
}

impl Session<'_> {
    fn spec(&self, op: Operation) -> EngineSpec {
        EngineSpec {
            identity: self.identity.clone(),
            workspace_dir: self.workspace.path().to_path_buf(),
            config: self.config.clone(),
            timeout: self.timeouts.get(op),
            diagnostics: self.diagnostics.mode(),
            env: self.env.clone(),
        }
    }
}

impl Orchestrator {
    /// Build an orchestrator using the engine backend named in `options`.
    pub fn new(options: Options) -> Result<Self, CoreError> {
        let backend = select_backend(&options.backend, &options.engine_binary)?;
        Ok(Self::with_backend(options, backend))
    }

    pub fn with_backend(options: Options, backend: Box<dyn EngineBackend>) -> Self {
        let layout = WorkspaceLayout::new(&options.data_dir);
        let state_store = StateStore::new(layout.clone());
        Self {
            options,
            layout,
            state_store,
            backend,
        }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Option timeouts with the config's `timeouts` table applied on top.
    pub fn effective_timeouts(&self, config: &ProviderConfig) -> Result<Timeouts, CoreError> {
        Ok(self.options.timeouts.merged(&config.timeout_overrides()?))
    }

    /// Provision the cluster described by `config` and return its
    /// connection details together with the resulting state.
    pub fn create(
        &self,
        provider: ProviderType,
        config: &ProviderConfig,
    ) -> Result<ClusterInfo, CoreError> {
        let mut session = self.open_session("create", provider, config)?;

        self.backend.apply(&session.spec(Operation::Apply))?;
        session.lifecycle.advance(Phase::Applied)?;

        let cluster = self
            .state_store
            .cluster_info(&session.identity)
            .map_err(CoreError::ClusterInfo)?;
        session.lifecycle.advance(Phase::Done)?;

        info!(
            "created cluster {} ({} resources)",
            session.identity,
            cluster.state.resource_count()
        );
        Ok(cluster)
    }

    /// Derive the cluster's status from `state`, or from the workspace's
    /// persisted state when none is supplied.
    ///
    /// Never creates, modifies or removes a workspace. On error the status
    /// is to be treated as unknown.
    pub fn status(
        &self,
        state: Option<&StateArtifact>,
        provider: ProviderType,
        config: &ProviderConfig,
    ) -> Result<ClusterStatus, CoreError> {
        let identity = config.identity(provider)?;
        self.effective_timeouts(config)?;
        let mut lifecycle = Lifecycle::start(format!("status {identity}"));
        lifecycle.advance(Phase::IdentityResolved)?;

        let status = match state {
            Some(state) => ClusterStatus::from_state(state),
            None => {
                let loaded = self
                    .state_store
                    .read(&identity)
                    .map_err(CoreError::NoState)?;
                ClusterStatus::from_state(&loaded)
            }
        };
        lifecycle.advance(Phase::StateReconciled)?;
        lifecycle.finish()?;

        debug!("status of {identity}: {}", status.phase);
        Ok(status)
    }

    /// Tear down the cluster.
    ///
    /// A supplied `state` is written into the workspace before the engine
    /// runs and becomes authoritative. Without one, the workspace must
    /// already hold a state artifact, otherwise the engine is never invoked.
    pub fn delete(
        &self,
        state: Option<&StateArtifact>,
        provider: ProviderType,
        config: &ProviderConfig,
    ) -> Result<(), CoreError> {
        let mut session = self.open_session("delete", provider, config)?;

        match state {
            Some(state) => self
                .state_store
                .write(&session.identity, state)
                .map_err(CoreError::StoreState)?,
            None => {
                let loaded = self
                    .state_store
                    .read(&session.identity)
                    .map_err(CoreError::NoState)?;
                debug!(
                    "loaded state for {} from workspace ({} resources)",
                    session.identity,
                    loaded.resource_count()
                );
            }
        }
        session.lifecycle.advance(Phase::StateReconciled)?;

        self.backend.destroy(&session.spec(Operation::Destroy))?;
        session.lifecycle.advance(Phase::Destroyed)?;
        session.lifecycle.advance(Phase::Done)?;

        info!("deleted cluster {}", session.identity);
        Ok(())
    }

    /// Steps shared by create and delete: resolve the identity, acquire the
    /// diagnostic scope and workspace, bootstrap the provider, initialize
    /// the engine and materialize the configuration.
    ///
    /// The module document is written before init, which installs the
    /// modules and plugins it references. Variables follow init.
    fn open_session<'a>(
        &self,
        verb: &str,
        provider: ProviderType,
        config: &'a ProviderConfig,
    ) -> Result<Session<'a>, CoreError> {
        let identity = config.identity(provider)?;
        let timeouts = self.effective_timeouts(config)?;
        let module_source = self.module_source(provider, config)?;
        let mut lifecycle = Lifecycle::start(format!("{verb} {identity}"));
        lifecycle.advance(Phase::IdentityResolved)?;
        info!("{verb} cluster {identity} using {} backend", self.backend.name());

        let diagnostics =
            DiagnosticScope::acquire(self.options.verbose, format!("{verb} {identity}"));
        let workspace = Workspace::acquire(&self.layout, &identity, self.options.persistent)
            .map_err(CoreError::Workspace)?;
        lifecycle.advance(Phase::WorkspaceReady)?;

        let mut env = EngineEnv::new();
        if provider.requires_bootstrap() {
            env = prepare_provider(provider, &self.layout.engine_dir())
                .map_err(CoreError::ProviderInit)?;
            lifecycle.advance(Phase::ProviderBootstrapped)?;
        }

        let mut session = Session {
            lifecycle,
            identity,
            timeouts,
            config,
            env,
            diagnostics,
            workspace,
        };

        materialize_module(
            &self.layout,
            &session.identity,
            config,
            &session.timeouts,
            &module_source,
        )
        .map_err(CoreError::ClusterData)?;
        self.backend.init(&session.spec(Operation::Init))?;
        session.lifecycle.advance(Phase::EngineInitialized)?;

        materialize_config(
            &self.layout,
            &session.identity,
            config,
            &session.timeouts,
            &module_source,
        )
        .map_err(CoreError::ClusterData)?;
        session.lifecycle.advance(Phase::ConfigMaterialized)?;

        Ok(session)
    }

    fn module_source(
        &self,
        provider: ProviderType,
        config: &ProviderConfig,
    ) -> Result<String, CoreError> {
        if let Some(source) = config.module_source()? {
            return Ok(source.to_owned());
        }
        Ok(self
            .options
            .effective_modules_dir()
            .join(provider.as_str())
            .to_string_lossy()
            .into_owned())
    }
}
