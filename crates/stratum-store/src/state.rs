use crate::layout::WorkspaceLayout;
use crate::{atomic_write, StoreError};
use std::fs;
use std::io::ErrorKind;
use stratum_schema::{ClusterIdentity, ClusterInfo, StateArtifact};
use tracing::{debug, info};

/// Reads and writes the state artifact kept inside each workspace.
pub struct StateStore {
    layout: WorkspaceLayout,
}

impl StateStore {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    /// Load the persisted artifact. Fails if it is missing or unparsable.
    pub fn read(&self, identity: &ClusterIdentity) -> Result<StateArtifact, StoreError> {
        let path = self.layout.state_file(identity);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::StateNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        StateArtifact::from_slice(&bytes).map_err(|source| StoreError::InvalidState {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist `state` as the authoritative artifact for `identity`.
    ///
    /// A different artifact already on disk is preserved as the backup file
    /// before being replaced. Both writes are atomic.
    pub fn write(
        &self,
        identity: &ClusterIdentity,
        state: &StateArtifact,
    ) -> Result<(), StoreError> {
        let path = self.layout.state_file(identity);
        fs::create_dir_all(self.layout.workspace_dir(identity))?;

        let new_digest = state.digest();
        match fs::read(&path) {
            Ok(existing) => {
                let existing_digest = StateArtifact::from_slice(&existing)
                    .ok()
                    .map(|s| s.digest());
                if existing_digest.as_deref() == Some(new_digest.as_str()) {
                    debug!(
                        "state for {identity} already up to date ({})",
                        &new_digest[..12]
                    );
                    return Ok(());
                }
                info!(
                    "replacing on-disk state for {identity} with supplied state ({})",
                    &new_digest[..12]
                );
                atomic_write(&self.layout.state_backup_file(identity), &existing)?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let content = state
            .to_json_pretty()
            .map_err(|source| StoreError::InvalidState {
                path: path.display().to_string(),
                source,
            })?;
        atomic_write(&path, content.as_bytes())?;
        debug!("wrote state for {identity} to {}", path.display());
        Ok(())
    }

    /// Connection details from the state left behind by a successful apply.
    pub fn cluster_info(&self, identity: &ClusterIdentity) -> Result<ClusterInfo, StoreError> {
        let state = self.read(identity)?;
        Ok(ClusterInfo::from_state(identity.clone(), state))
    }
}
