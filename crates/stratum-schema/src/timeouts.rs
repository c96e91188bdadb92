//! Engine operations and their timeouts.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// An external engine verb. Also the key for timeout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Init,
    Apply,
    Destroy,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Operation::Init),
            "apply" | "create" => Ok(Operation::Apply),
            "destroy" | "delete" => Ok(Operation::Destroy),
            other => Err(format!(
                "unknown operation '{other}', expected init, apply or destroy"
            )),
        }
    }
}

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_DESTROY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Per-operation timeouts for engine invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub init: Duration,
    pub apply: Duration,
    pub destroy: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            init: DEFAULT_INIT_TIMEOUT,
            apply: DEFAULT_APPLY_TIMEOUT,
            destroy: DEFAULT_DESTROY_TIMEOUT,
        }
    }
}

impl Timeouts {
    pub fn get(&self, op: Operation) -> Duration {
        match op {
            Operation::Init => self.init,
            Operation::Apply => self.apply,
            Operation::Destroy => self.destroy,
        }
    }

    pub fn set(&mut self, op: Operation, timeout: Duration) {
        match op {
            Operation::Init => self.init = timeout,
            Operation::Apply => self.apply = timeout,
            Operation::Destroy => self.destroy = timeout,
        }
    }

    /// Return a copy with `overrides` applied on top.
    #[must_use]
    pub fn merged(mut self, overrides: &BTreeMap<Operation, Duration>) -> Self {
        for (op, timeout) in overrides {
            self.set(*op, *timeout);
        }
        self
    }
}

/// Parse a timeout table such as `{ "apply": "45m", "init": 120 }`.
///
/// String values go through [`parse_duration`]; integers are seconds.
pub fn parse_timeout_table(
    key: &str,
    table: &serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<Operation, Duration>, ConfigError> {
    let mut out = BTreeMap::new();
    for (name, value) in table {
        let entry_key = format!("{key}.{name}");
        let op: Operation = name.parse().map_err(|reason| ConfigError::InvalidKey {
            key: entry_key.clone(),
            reason,
        })?;
        let timeout = match value {
            serde_json::Value::String(s) => parse_duration(s).map_err(|reason| {
                ConfigError::InvalidKey {
                    key: entry_key.clone(),
                    reason,
                }
            })?,
            serde_json::Value::Number(n) => {
                let secs = n.as_u64().ok_or_else(|| ConfigError::InvalidKey {
                    key: entry_key.clone(),
                    reason: "must be a non-negative number of seconds".to_owned(),
                })?;
                Duration::from_secs(secs)
            }
            _ => {
                return Err(ConfigError::InvalidKey {
                    key: entry_key,
                    reason: "must be a duration string or integer seconds".to_owned(),
                })
            }
        };
        if timeout.is_zero() {
            return Err(ConfigError::InvalidKey {
                key: entry_key,
                reason: "must be greater than zero".to_owned(),
            });
        }
        out.insert(op, timeout);
    }
    Ok(out)
}

/// Parse `30s`, `10m`, `1h` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s, 1)
    };
    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{s}', expected e.g. 1h, 30m, 3600s"))?;
    n.checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is out of range"))
}

/// Format a duration the way the engine's module timeouts expect (`90m`, `45s`).
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
