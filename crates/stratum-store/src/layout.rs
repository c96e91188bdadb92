use std::path::{Path, PathBuf};
use stratum_schema::ClusterIdentity;

pub const STATE_FILE: &str = "terraform.tfstate";
pub const STATE_BACKUP_FILE: &str = "terraform.tfstate.backup";
pub const VARS_FILE: &str = "terraform.tfvars.json";
pub const MAIN_FILE: &str = "main.tf.json";
/// Scratch directory the engine creates on init (plugins, backend config).
pub const ENGINE_DIR: &str = ".terraform";

/// Directory layout under the Stratum data directory.
///
/// Every cluster identity owns `<root>/<project>/<cluster_name>/<provider>`.
/// Identity segments are validated as single path components, so distinct
/// identities never share a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn workspace_dir(&self, identity: &ClusterIdentity) -> PathBuf {
        self.root
            .join(identity.project.as_str())
            .join(identity.cluster_name.as_str())
            .join(identity.provider.as_str())
    }

    #[inline]
    pub fn state_file(&self, identity: &ClusterIdentity) -> PathBuf {
        self.workspace_dir(identity).join(STATE_FILE)
    }

    #[inline]
    pub fn state_backup_file(&self, identity: &ClusterIdentity) -> PathBuf {
        self.workspace_dir(identity).join(STATE_BACKUP_FILE)
    }

    #[inline]
    pub fn vars_file(&self, identity: &ClusterIdentity) -> PathBuf {
        self.workspace_dir(identity).join(VARS_FILE)
    }

    #[inline]
    pub fn main_file(&self, identity: &ClusterIdentity) -> PathBuf {
        self.workspace_dir(identity).join(MAIN_FILE)
    }

    /// Default location of the per-provider engine modules.
    #[inline]
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join("modules")
    }

    /// Engine-wide files shared by all workspaces (CLI config, plugin mirror).
    #[inline]
    pub fn engine_dir(&self) -> PathBuf {
        self.root.join("engine")
    }
}
