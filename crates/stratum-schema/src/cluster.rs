use crate::identity::ClusterIdentity;
use crate::state::StateArtifact;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const ENDPOINT_OUTPUT: &str = "endpoint";
pub const CA_CERTIFICATE_OUTPUT: &str = "ca_certificate";
pub const KUBECONFIG_OUTPUT: &str = "kubeconfig";

/// Connection details of a provisioned cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub identity: ClusterIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    /// Every output the engine reported, including the ones above.
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
    /// State after the apply. Callers running with ephemeral workspaces must
    /// keep this to be able to query or delete the cluster later.
    pub state: StateArtifact,
}

impl ClusterInfo {
    pub fn from_state(identity: ClusterIdentity, state: StateArtifact) -> Self {
        let outputs = state.outputs();
        let text = |key: &str| outputs.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            endpoint: text(ENDPOINT_OUTPUT),
            ca_certificate: text(CA_CERTIFICATE_OUTPUT),
            kubeconfig: text(KUBECONFIG_OUTPUT),
            identity,
            outputs,
            state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterPhase {
    Unknown,
    Provisioned,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterPhase::Unknown => write!(f, "unknown"),
            ClusterPhase::Provisioned => write!(f, "provisioned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub phase: ClusterPhase,
}

impl ClusterStatus {
    pub const UNKNOWN: ClusterStatus = ClusterStatus {
        phase: ClusterPhase::Unknown,
    };

    /// Provisioned iff the state owns at least one resource.
    pub fn from_state(state: &StateArtifact) -> Self {
        let phase = if state.has_resources() {
            ClusterPhase::Provisioned
        } else {
            ClusterPhase::Unknown
        };
        Self { phase }
    }
}
