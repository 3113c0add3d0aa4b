use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReverieError {
    // Graph validation errors
    #[error("Node '{node}' references unknown successor '{successor}'")]
    InvalidNodeReference { node: String, successor: String },

    #[error("Cycle detected in workflow graph at node '{0}'")]
    CycleDetected(String),

    #[error("No node implementation registered for '{0}'")]
    UnknownNodeImplementation(String),

    #[error("Duplicate node id in workflow graph: '{0}'")]
    DuplicateNodeId(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{tool}' has no method '{method}'")]
    ToolMethodNotFound { tool: String, method: String },

    #[error("Tool method failed: {tool}.{method}: {message}")]
    ToolExecution {
        tool: String,
        method: String,
        message: String,
    },

    // Execution errors
    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    #[error("Node '{node}' timed out after {timeout_secs}s")]
    NodeTimeout { node: String, timeout_secs: u64 },

    #[error("Workflow run exceeded its deadline ({deadline_secs}s)")]
    DeadlineExceeded { deadline_secs: u64 },

    // Context errors
    #[error("Missing input key: '{0}'")]
    MissingInput(String),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReverieError>;
