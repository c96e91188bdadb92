//! Identity segment names.
//!
//! Both are plain strings on the wire. Values are only constructed through
//! `ClusterIdentity::new`, which validates them as single path segments.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! segment_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub(crate) fn new(segment: &str) -> Self {
                Self(segment.to_owned())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

segment_name!(
    /// Project (account, subscription, or Gardener project) the cluster belongs to.
    ProjectName
);

segment_name!(
    /// Name of the cluster within its project.
    ClusterName
);
