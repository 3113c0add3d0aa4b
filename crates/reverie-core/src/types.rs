use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single workflow run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling category of a workflow node.
///
/// Entry/Middle/Exit nodes form the main synchronous path; After nodes are
/// excluded from the successor walk and only run in the engine's dedicated
/// background phase once the main path has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Entry,
    Middle,
    Exit,
    After,
}

/// Lifecycle state of a single node execution.
///
/// Terminal in both Completed and Failed; there is no retry or re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Final status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Result of executing a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionResult {
    /// Which node was executed.
    pub node_id: String,
    /// Terminal status for this node.
    pub status: NodeStatus,
    /// The output map the node produced (None on failure).
    pub output: Option<HashMap<String, serde_json::Value>>,
    /// Error description when the node failed.
    pub error: Option<String>,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
}

impl NodeExecutionResult {
    pub fn completed(
        node_id: impl Into<String>,
        output: HashMap<String, serde_json::Value>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Completed,
            output: Some(output),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(node_id: impl Into<String>, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Failed,
            output: None,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == NodeStatus::Completed
    }
}

/// Result of executing an entire workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    /// Unique id for this run.
    pub run_id: RunId,
    /// Which workflow was executed.
    pub workflow_id: String,
    /// Overall run status.
    pub status: RunStatus,
    /// Snapshot of the context's output store at the end of the main path.
    pub output_data: HashMap<String, serde_json::Value>,
    /// Per-node results in completion order.
    pub node_results: Vec<NodeExecutionResult>,
    /// Error description when the run failed.
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the main path finished.
    pub finished_at: DateTime<Utc>,
}

impl WorkflowExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
