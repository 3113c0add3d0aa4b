use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use reverie_core::error::{Result, ReverieError};

use crate::tool::Tool;

/// Registry of available tools, keyed by tool type name.
///
/// The registry is an explicit value handed to node factories at graph
/// construction time; there is no process-global table. Re-registering a
/// type name is idempotent: the last registration wins.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under its declared type name.
    ///
    /// Last write wins on duplicates; overrides are logged, not rejected.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            debug!(tool = %name, "Tool re-registered, previous registration replaced");
        }
    }

    /// Unregister a tool by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Look up a tool and dispatch one of its methods in a single step.
    pub async fn dispatch(
        &self,
        tool: &str,
        method: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let tool = self
            .get(tool)
            .ok_or_else(|| ReverieError::ToolNotFound(tool.to_string()))?;

        tool.dispatch(method, args).await
    }
}
