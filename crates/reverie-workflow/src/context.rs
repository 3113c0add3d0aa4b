use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reverie_core::error::{Result, ReverieError};

/// Per-run shared store for inter-node communication.
///
/// Two logical maps: inputs are seeded by the caller before the run and
/// read-only thereafter; outputs are written by nodes as they complete and
/// readable by any node executed afterward. The handle is cheap to clone —
/// batch members touch the same store concurrently, and the background
/// after-phase keeps it alive past the main path's return.
///
/// Each output key is expected to be written by exactly one node; on a
/// violation the last writer wins.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    inner: Arc<RwLock<Stores>>,
}

#[derive(Debug, Default)]
struct Stores {
    inputs: HashMap<String, serde_json::Value>,
    outputs: HashMap<String, serde_json::Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-seeded with initial inputs.
    pub fn with_inputs(inputs: HashMap<String, serde_json::Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Stores {
                inputs,
                outputs: HashMap::new(),
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Stores> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Stores> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an input key before the run.
    pub fn set_input(&self, key: impl Into<String>, value: serde_json::Value) {
        self.write().inputs.insert(key.into(), value);
    }

    /// Read an input key.
    ///
    /// Absence is a configuration error, not a retryable condition.
    pub fn input(&self, key: &str) -> Result<serde_json::Value> {
        self.read()
            .inputs
            .get(key)
            .cloned()
            .ok_or_else(|| ReverieError::MissingInput(key.to_string()))
    }

    /// Read an input key as a string.
    pub fn input_str(&self, key: &str) -> Result<String> {
        let value = self.input(key)?;
        match value {
            serde_json::Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    /// Write an output key. No existence check; last writer wins.
    pub fn set_output(&self, key: impl Into<String>, value: serde_json::Value) {
        self.write().outputs.insert(key.into(), value);
    }

    /// Read an output key, if some node has written it.
    pub fn output(&self, key: &str) -> Option<serde_json::Value> {
        self.read().outputs.get(key).cloned()
    }

    /// Write a whole output map in one locked pass.
    pub fn merge_outputs(&self, outputs: HashMap<String, serde_json::Value>) {
        self.write().outputs.extend(outputs);
    }

    /// Immutable copy of the accumulated output map.
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.read().outputs.clone()
    }
}
