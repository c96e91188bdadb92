use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Infrastructure provider a cluster is provisioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gardener,
    Gcp,
    Azure,
    Aws,
    Kind,
}

impl ProviderType {
    pub const ALL: [ProviderType; 5] = [
        ProviderType::Gardener,
        ProviderType::Gcp,
        ProviderType::Azure,
        ProviderType::Aws,
        ProviderType::Kind,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::Gardener => "gardener",
            ProviderType::Gcp => "gcp",
            ProviderType::Azure => "azure",
            ProviderType::Aws => "aws",
            ProviderType::Kind => "kind",
        }
    }

    /// Whether a process-wide setup step must run before any engine
    /// invocation for this provider.
    pub fn requires_bootstrap(self) -> bool {
        matches!(self, ProviderType::Gardener)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gardener" => Ok(ProviderType::Gardener),
            "gcp" | "gke" => Ok(ProviderType::Gcp),
            "azure" | "aks" => Ok(ProviderType::Azure),
            "aws" | "eks" => Ok(ProviderType::Aws),
            "kind" => Ok(ProviderType::Kind),
            other => Err(format!(
                "unknown provider '{other}', expected one of: gardener, gcp, azure, aws, kind"
            )),
        }
    }
}
