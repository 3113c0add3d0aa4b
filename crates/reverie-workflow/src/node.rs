use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use reverie_core::error::Result;
use reverie_core::types::{NodeCategory, NodeExecutionResult};

use crate::context::ExecutionContext;

/// Static description of a node in a workflow graph.
///
/// Descriptors are produced by application configuration and never mutated
/// during execution. Every id in `next` must exist as a descriptor id in
/// the same graph; the engine's `validate()` enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Unique identifier within the graph.
    pub id: String,
    /// Implementation name, resolved against a `NodeRegistry`.
    pub implementation: String,
    /// Scheduling category.
    pub category: NodeCategory,
    /// Successor node ids.
    #[serde(default)]
    pub next: Vec<String>,
}

impl NodeDescriptor {
    pub fn new(
        id: impl Into<String>,
        implementation: impl Into<String>,
        category: NodeCategory,
    ) -> Self {
        Self {
            id: id.into(),
            implementation: implementation.into(),
            category,
            next: vec![],
        }
    }

    /// Set the successor ids.
    pub fn with_next(mut self, next: Vec<String>) -> Self {
        self.next = next;
        self
    }
}

/// The smallest orchestrated unit of work.
///
/// A node reads whatever keys it needs from the [`ExecutionContext`],
/// typically delegates to a tool operation, and returns a plain output map.
/// The provided [`execute`](WorkflowNode::execute) wrapper writes that map
/// into the context and folds any error into a `Failed` result — a failed
/// node never writes partial output.
pub trait WorkflowNode: Send + Sync + 'static {
    /// Static graph metadata for this node.
    fn descriptor(&self) -> &NodeDescriptor;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn category(&self) -> NodeCategory {
        self.descriptor().category
    }

    fn next(&self) -> &[String] {
        &self.descriptor().next
    }

    /// True if this node is explicitly marked as an entry point.
    ///
    /// The engine additionally treats unreferenced main-path nodes as
    /// entries when a graph marks none.
    fn is_entry(&self) -> bool {
        self.category() == NodeCategory::Entry
    }

    /// The node's single abstract operation.
    fn process<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<HashMap<String, serde_json::Value>>>;

    /// Run `process`, publish its outputs, and wrap the outcome.
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, NodeExecutionResult> {
        Box::pin(async move {
            let start = Instant::now();
            debug!(node_id = %self.id(), "Node running");

            match self.process(ctx).await {
                Ok(output) => {
                    ctx.merge_outputs(output.clone());
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    debug!(node_id = %self.id(), elapsed_ms, "Node completed");
                    NodeExecutionResult::completed(self.id(), output, elapsed_ms)
                }
                Err(e) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    error!(node_id = %self.id(), error = %e, "Node failed");
                    NodeExecutionResult::failed(self.id(), e.to_string(), elapsed_ms)
                }
            }
        })
    }
}

impl std::fmt::Debug for dyn WorkflowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowNode")
            .field("descriptor", self.descriptor())
            .finish()
    }
}

type NodeOp = dyn Fn(ExecutionContext) -> BoxFuture<'static, Result<HashMap<String, serde_json::Value>>>
    + Send
    + Sync;

/// Closure-backed node for lightweight implementations and tests.
pub struct FnNode {
    descriptor: NodeDescriptor,
    op: Arc<NodeOp>,
}

impl FnNode {
    pub fn new<F, Fut>(descriptor: NodeDescriptor, op: F) -> Self
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<HashMap<String, serde_json::Value>>>
            + Send
            + 'static,
    {
        Self {
            descriptor,
            op: Arc::new(move |ctx| Box::pin(op(ctx))),
        }
    }
}

impl WorkflowNode for FnNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    fn process<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<HashMap<String, serde_json::Value>>> {
        (self.op)(ctx.clone())
    }
}
