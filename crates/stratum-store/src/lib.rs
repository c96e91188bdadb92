//! Workspace management and state persistence for Stratum.
//!
//! This crate provides the storage layer: `WorkspaceLayout` for the
//! `<data_dir>/<project>/<cluster>/<provider>` directory scheme, the
//! `Workspace` guard that removes ephemeral workspaces on every exit path,
//! `StateStore` for atomic state artifact reads and writes, and
//! `materialize_module` / `materialize_config` for writing the engine's input
//! files.

pub mod layout;
pub mod materialize;
pub mod state;
pub mod workspace;

pub use layout::{
    WorkspaceLayout, ENGINE_DIR, MAIN_FILE, STATE_BACKUP_FILE, STATE_FILE, VARS_FILE,
};
pub use materialize::{materialize_config, materialize_module};
pub use state::StateStore;
pub use workspace::{cleanup, Workspace};

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee a rename is durable without syncing the parent
/// directory, so every atomic write below ends with this.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Write `content` to `dest` via a temp file in the same directory and a rename.
/// A crash mid-write leaves the previous file intact.
pub fn atomic_write(dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = dest
        .parent()
        .ok_or_else(|| StoreError::InvalidPath(dest.display().to_string()))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not create workspace '{path}': {source}")]
    Workspace {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("no state artifact found at {0}")]
    StateNotFound(String),
    #[error("invalid state artifact at {path}: {source}")]
    InvalidState {
        path: String,
        source: stratum_schema::StateError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_state_not_found() {
        let e = StoreError::StateNotFound("/data/p/c/gcp/terraform.tfstate".to_owned());
        assert!(e.to_string().contains("no state artifact"));
        assert!(e.to_string().contains("/data/p/c/gcp"));
    }

    #[test]
    fn store_error_display_workspace() {
        let e = StoreError::Workspace {
            path: "/ro/p".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/ro/p"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.json");
        atomic_write(&dest, b"one").unwrap();
        atomic_write(&dest, b"two").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"two");

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "no temp files may remain");
    }
}
