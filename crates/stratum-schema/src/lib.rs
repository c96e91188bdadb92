//! Cluster identity, provider configuration, timeouts, and state artifact types for Stratum.
//!
//! This crate defines the schema layer: the provider enum (`ProviderType`),
//! typed identity extraction from a loosely-typed provider config
//! (`ProviderConfig::identity`), per-operation engine timeouts (`Timeouts`),
//! the opaque engine snapshot (`StateArtifact`), and the results handed back
//! to callers (`ClusterInfo`, `ClusterStatus`).

pub mod cluster;
pub mod config;
pub mod identity;
pub mod provider;
pub mod state;
pub mod timeouts;
pub mod types;

pub use cluster::{ClusterInfo, ClusterPhase, ClusterStatus};
pub use config::{ConfigError, ProviderConfig};
pub use identity::{validate_segment, ClusterIdentity};
pub use provider::ProviderType;
pub use state::{StateArtifact, StateError};
pub use timeouts::{format_duration, parse_duration, parse_timeout_table, Operation, Timeouts};
pub use types::{ClusterName, ProjectName};
