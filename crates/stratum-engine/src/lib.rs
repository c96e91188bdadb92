//! External engine adapters for Stratum.
//!
//! This crate implements the execution layer: the `EngineBackend` trait with a
//! process-based backend (`CommandBackend`, driving a Terraform-compatible
//! binary under a timeout) and an in-process `MockBackend`, the per-operation
//! `DiagnosticScope` that keeps engine chatter off the terminal, the provider
//! bootstrap hook, and engine prerequisite checking.

pub mod backend;
pub mod bootstrap;
pub mod command;
pub mod diagnostics;
pub mod mock;
pub mod prereq;

pub use backend::{select_backend, EngineBackend, EngineEnv, EngineSpec};
pub use bootstrap::{prepare_provider, CLI_CONFIG_ENV};
pub use command::CommandBackend;
pub use diagnostics::{DiagnosticMode, DiagnosticScope};
pub use mock::{MockBackend, MockCall};
pub use prereq::{check_engine_prereqs, format_missing, MissingPrereq};

use std::time::Duration;
use stratum_schema::{format_duration, Operation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("failed to run '{binary}': {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
    #[error("engine {op} failed: {detail}")]
    Failed { op: Operation, detail: String },
    #[error("engine {op} timed out after {}", format_duration(*.timeout))]
    Timeout { op: Operation, timeout: Duration },
    #[error("provider bootstrap failed: {0}")]
    Bootstrap(String),
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout { .. })
    }
}
