use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("state artifact must be a JSON object")]
    NotAnObject,
}

/// Snapshot of previously applied infrastructure, as written by the engine.
///
/// The format belongs to the engine. Only the fields needed by the lifecycle
/// are interpreted: the `resources` list, `outputs`, `serial` and `lineage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct StateArtifact {
    doc: Value,
}

impl TryFrom<Value> for StateArtifact {
    type Error = StateError;

    fn try_from(doc: Value) -> Result<Self, Self::Error> {
        if doc.is_object() {
            Ok(Self { doc })
        } else {
            Err(StateError::NotAnObject)
        }
    }
}

impl From<StateArtifact> for Value {
    fn from(state: StateArtifact) -> Self {
        state.doc
    }
}

impl StateArtifact {
    pub fn from_value(doc: Value) -> Result<Self, StateError> {
        Self::try_from(doc)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StateError> {
        Self::try_from(serde_json::from_slice::<Value>(bytes)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.doc
    }

    pub fn resource_count(&self) -> usize {
        self.doc
            .get("resources")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Whether the snapshot owns at least one resource.
    pub fn has_resources(&self) -> bool {
        self.resource_count() > 0
    }

    pub fn serial(&self) -> Option<u64> {
        self.doc.get("serial").and_then(Value::as_u64)
    }

    pub fn lineage(&self) -> Option<&str> {
        self.doc.get("lineage").and_then(Value::as_str)
    }

    /// Output values keyed by name. Engine output entries of the form
    /// `{"value": .., "type": ..}` are unwrapped to their value.
    pub fn outputs(&self) -> BTreeMap<String, Value> {
        let Some(outputs) = self.doc.get("outputs").and_then(Value::as_object) else {
            return BTreeMap::new();
        };
        outputs
            .iter()
            .map(|(name, entry)| {
                let value = entry.get("value").cloned().unwrap_or_else(|| entry.clone());
                (name.clone(), value)
            })
            .collect()
    }

    /// blake3 digest of the compact serialization, for comparing snapshots.
    pub fn digest(&self) -> String {
        blake3::hash(self.doc.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}
