//! Lifecycle orchestration for Stratum clusters.
//!
//! This crate ties together identity resolution, workspace management, state
//! persistence and the engine adapters into the `Orchestrator`, the public
//! API for creating, inspecting and deleting clusters. It also provides the
//! `Options` builder and the per-operation lifecycle state machine.

pub mod lifecycle;
pub mod options;
pub mod orchestrator;

pub use lifecycle::{validate_transition, Lifecycle, Phase};
pub use options::Options;
pub use orchestrator::Orchestrator;

use stratum_engine::EngineError;
use stratum_schema::ConfigError;
use stratum_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid options file '{path}': {reason}")]
    Options { path: String, reason: String },
    #[error("workspace error: {0}")]
    Workspace(#[source] StoreError),
    #[error("could not initialize the provider: {0}")]
    ProviderInit(#[source] EngineError),
    #[error("could not initialize cluster data: {0}")]
    ClusterData(#[source] StoreError),
    #[error("no state provided, attempted to load from file: {0}")]
    NoState(#[source] StoreError),
    #[error("could not store state into file: {0}")]
    StoreState(#[source] StoreError),
    #[error("could not read cluster info: {0}")]
    ClusterInfo(#[source] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl CoreError {
    /// True when the engine gave up because an operation timeout expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Engine(e) if e.is_timeout())
    }
}
