use crate::layout::WorkspaceLayout;
use crate::StoreError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stratum_schema::ClusterIdentity;
use tracing::{debug, warn};

/// An acquired workspace directory.
///
/// Non-persistent workspaces are removed when the guard is dropped, which
/// happens after the owning operation has produced its result, on success,
/// error, and early return alike. Removal failures are logged and never
/// change the operation's outcome.
///
/// Only the `<provider>` directory itself is ever removed. The `<project>`
/// and `<cluster>` parents are shared with sibling identities and stay in
/// place, so a concurrent `acquire` under the same parent cannot lose its
/// path halfway through creation.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    persistent: bool,
}

impl Workspace {
    /// Resolve and create the workspace for `identity`.
    ///
    /// The guard exists before the directory is created, so a partially
    /// created tree is still cleaned up when creation fails.
    pub fn acquire(
        layout: &WorkspaceLayout,
        identity: &ClusterIdentity,
        persistent: bool,
    ) -> Result<Self, StoreError> {
        let ws = Self {
            path: layout.workspace_dir(identity),
            persistent,
        };
        fs::create_dir_all(&ws.path).map_err(|source| StoreError::Workspace {
            path: ws.path.display().to_string(),
            source,
        })?;
        debug!(
            "workspace ready: {} (persistent: {persistent})",
            ws.path.display()
        );
        Ok(ws)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.persistent {
            cleanup(&self.path);
        }
    }
}

/// Remove a workspace tree. Best-effort: failures are logged, never returned.
pub fn cleanup(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => debug!("removed ephemeral workspace {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove workspace {}: {e}", path.display()),
    }
}
