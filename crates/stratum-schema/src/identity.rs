use crate::config::ConfigError;
use crate::provider::ProviderType;
use crate::types::{ClusterName, ProjectName};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SEGMENT_LEN: usize = 128;

/// Identity of a cluster: one workspace and one state artifact per identity.
///
/// Both name components are restricted to single, portable path segments so
/// that the workspace path derived from an identity is injective.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub project: ProjectName,
    pub cluster_name: ClusterName,
    pub provider: ProviderType,
}

impl ClusterIdentity {
    pub fn new(
        project: &str,
        cluster_name: &str,
        provider: ProviderType,
    ) -> Result<Self, ConfigError> {
        validate_segment("project", project)?;
        validate_segment("cluster_name", cluster_name)?;
        Ok(Self {
            project: ProjectName::new(project),
            cluster_name: ClusterName::new(cluster_name),
            provider,
        })
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.cluster_name, self.provider)
    }
}

pub fn validate_segment(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidKey {
        key: key.to_owned(),
        reason: reason.to_owned(),
    };
    if value.is_empty() || value.len() > MAX_SEGMENT_LEN {
        return Err(invalid("must be 1-128 characters"));
    }
    if value == "." || value == ".." {
        return Err(invalid("must not be '.' or '..'"));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(invalid("must match [a-zA-Z0-9._-]"));
    }
    Ok(())
}
