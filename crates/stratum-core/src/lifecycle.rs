use crate::CoreError;
use std::fmt;
use tracing::{debug, trace};

/// Progress of a single orchestrator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    IdentityResolved,
    WorkspaceReady,
    ProviderBootstrapped,
    EngineInitialized,
    ConfigMaterialized,
    /// The authoritative state artifact is known (loaded or persisted).
    StateReconciled,
    Applied,
    Destroyed,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Start => "start",
            Phase::IdentityResolved => "identity-resolved",
            Phase::WorkspaceReady => "workspace-ready",
            Phase::ProviderBootstrapped => "provider-bootstrapped",
            Phase::EngineInitialized => "engine-initialized",
            Phase::ConfigMaterialized => "config-materialized",
            Phase::StateReconciled => "state-reconciled",
            Phase::Applied => "applied",
            Phase::Destroyed => "destroyed",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: Phase, to: Phase) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (Phase::Start, Phase::IdentityResolved)
            | (
                Phase::IdentityResolved,
                Phase::WorkspaceReady | Phase::StateReconciled
            )
            | (
                Phase::WorkspaceReady,
                Phase::ProviderBootstrapped | Phase::EngineInitialized
            )
            | (Phase::ProviderBootstrapped, Phase::EngineInitialized)
            | (Phase::EngineInitialized, Phase::ConfigMaterialized)
            | (
                Phase::ConfigMaterialized,
                Phase::Applied | Phase::StateReconciled
            )
            | (Phase::StateReconciled, Phase::Destroyed)
    ) || (to == Phase::Done && from != Phase::Done);

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Tracks the phase of one operation and logs every transition.
#[derive(Debug)]
pub struct Lifecycle {
    label: String,
    phase: Phase,
}

impl Lifecycle {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            phase: Phase::Start,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn advance(&mut self, to: Phase) -> Result<(), CoreError> {
        validate_transition(self.phase, to)?;
        debug!("{}: {} -> {to}", self.label, self.phase);
        self.phase = to;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), CoreError> {
        self.advance(Phase::Done)
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.phase != Phase::Done {
            trace!("{}: aborted in phase {}", self.label, self.phase);
        }
    }
}
