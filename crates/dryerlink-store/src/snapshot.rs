// ── Point-in-time subtree snapshots ──

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::path::StorePath;

/// Immutable view of the value stored under a path at one instant.
///
/// An absent value (`None`) means nothing is stored there; the store
/// never holds explicit `null`s.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: StorePath, value: Option<Value>) -> Self {
        let value = value.filter(|v| !v.is_null());
        Self { path, value }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// Snapshot of a direct child. Absent if this node is not an object
    /// or has no such key.
    pub fn child(&self, key: &str) -> Snapshot {
        let value = self
            .value
            .as_ref()
            .and_then(|v| v.get(key))
            .cloned();
        Snapshot::new(self.path.child(key), value)
    }

    /// Direct children in key order. Empty for leaves and absent nodes.
    pub fn children(&self) -> Vec<Snapshot> {
        match &self.value {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| Snapshot::new(self.path.child(k.clone()), Some(v.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decode the value into `T`. `Ok(None)` when nothing is stored.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        let Some(value) = &self.value else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::Deserialization {
                path: self.path.to_string(),
                message: e.to_string(),
            })
    }
}
