use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reverie_core::error::{Result, ReverieError};
use reverie_core::types::{
    NodeCategory, NodeExecutionResult, RunId, RunStatus, WorkflowExecutionResult,
};

use crate::context::ExecutionContext;
use crate::graph::{NodeRegistry, WorkflowGraph};
use crate::node::{NodeDescriptor, WorkflowNode};

/// Behavior knobs for a workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// When true, `execute()` does not return until the after-phase has
    /// finished. Default is fire-and-forget.
    #[serde(default)]
    pub await_after_nodes: bool,
    /// Per-node execution timeout. A node that exceeds it fails its batch.
    #[serde(default)]
    pub node_timeout_secs: Option<u64>,
    /// Wall-clock deadline for the whole main path.
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,
}

/// Orchestrates one workflow graph: validation, staged main-path execution
/// with EXIT short-circuit, and the best-effort background after-phase.
///
/// Nodes are instantiated once at construction from the caller-supplied
/// [`NodeRegistry`]; a misconfigured graph fails here, never mid-run.
#[derive(Debug)]
pub struct WorkflowEngine {
    graph: WorkflowGraph,
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    options: ExecutionOptions,
}

impl WorkflowEngine {
    pub fn new(
        graph: WorkflowGraph,
        registry: &NodeRegistry,
        options: ExecutionOptions,
    ) -> Result<Self> {
        let nodes = registry.instantiate(&graph)?;
        Ok(Self {
            graph,
            nodes,
            options,
        })
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Check the graph's structural invariants.
    ///
    /// Every successor id must name a node in the graph, and the graph must
    /// be acyclic. Runs before any node executes; `execute()` calls it
    /// implicitly.
    pub fn validate(&self) -> Result<()> {
        for descriptor in &self.graph.nodes {
            for successor in &descriptor.next {
                if self.graph.descriptor(successor).is_none() {
                    return Err(ReverieError::InvalidNodeReference {
                        node: descriptor.id.clone(),
                        successor: successor.clone(),
                    });
                }
            }
        }

        // DFS over every component, so an entry-less cyclic subgraph still
        // fails instead of silently never executing.
        let by_id: HashMap<&str, &NodeDescriptor> = self
            .graph
            .nodes
            .iter()
            .map(|d| (d.id.as_str(), d))
            .collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: HashSet<&str> = HashSet::new();

        for descriptor in &self.graph.nodes {
            Self::visit(&descriptor.id, &by_id, &mut visited, &mut stack)?;
        }

        Ok(())
    }

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a NodeDescriptor>,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if stack.contains(id) {
            return Err(ReverieError::CycleDetected(id.to_string()));
        }
        if visited.contains(id) {
            return Ok(());
        }

        visited.insert(id);
        stack.insert(id);

        if let Some(descriptor) = by_id.get(id) {
            for successor in &descriptor.next {
                Self::visit(successor, by_id, visited, stack)?;
            }
        }

        stack.remove(id);
        Ok(())
    }

    /// Run the workflow against a context seeded with initial inputs.
    ///
    /// Structural errors are returned as `Err`; per-node failures during
    /// the main path surface as a `Failed` result with the triggering error
    /// attached. The after-phase never affects the returned result.
    pub async fn execute(&self, context: ExecutionContext) -> Result<WorkflowExecutionResult> {
        self.validate()?;

        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            workflow_id = %self.graph.id,
            workflow = %self.graph.name,
            "Workflow run started"
        );

        let (node_results, error) = match self.options.run_deadline_secs {
            Some(secs) => {
                match tokio::time::timeout(
                    Duration::from_secs(secs),
                    self.execute_main(&context),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let e = ReverieError::DeadlineExceeded { deadline_secs: secs };
                        warn!(run_id = %run_id, deadline_secs = secs, "Workflow run hit deadline");
                        (Vec::new(), Some(e.to_string()))
                    }
                }
            }
            None => self.execute_main(&context).await,
        };

        // Snapshot at the end of the main path; after-phase writes land in
        // the caller's context handle, not in this result.
        let output_data = context.snapshot();
        let status = if error.is_none() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        let finished_at = Utc::now();

        info!(
            run_id = %run_id,
            workflow_id = %self.graph.id,
            status = ?status,
            nodes_executed = node_results.len(),
            "Workflow main path finished"
        );

        if status == RunStatus::Completed {
            self.start_after_phase(&context).await;
        }

        Ok(WorkflowExecutionResult {
            run_id,
            workflow_id: self.graph.id.clone(),
            status,
            output_data,
            node_results,
            error,
            started_at,
            finished_at,
        })
    }

    /// Drive the ENTRY/MIDDLE/EXIT batches to completion.
    ///
    /// A node is scheduled only once every one of its main-path
    /// predecessors has completed, so diamonds whose arms span different
    /// numbers of batches still resolve in dependency order.
    async fn execute_main(
        &self,
        context: &ExecutionContext,
    ) -> (Vec<NodeExecutionResult>, Option<String>) {
        let main_ids: HashSet<&str> = self
            .graph
            .nodes
            .iter()
            .filter(|d| d.category != NodeCategory::After)
            .map(|d| d.id.as_str())
            .collect();

        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        for descriptor in &self.graph.nodes {
            if descriptor.category == NodeCategory::After {
                continue;
            }
            for successor in &descriptor.next {
                if main_ids.contains(successor.as_str()) {
                    predecessors
                        .entry(successor.as_str())
                        .or_default()
                        .push(descriptor.id.as_str());
                }
            }
        }

        let mut batch: Vec<&str> = self.graph.entry_ids();
        let mut processed: HashSet<&str> = HashSet::new();
        let mut processed_order: Vec<&str> = Vec::new();
        let mut results: Vec<NodeExecutionResult> = Vec::new();
        let mut batch_index = 0usize;

        while !batch.is_empty() {
            debug!(batch_index, nodes = ?batch, "Executing batch");

            let futs: Vec<_> = batch
                .iter()
                .filter_map(|id| self.nodes.get(*id))
                .map(|node| Self::run_node(node.clone(), context.clone(), self.options.node_timeout_secs))
                .collect();
            let batch_results = join_all(futs).await;

            let failure = batch_results
                .iter()
                .find(|r| !r.succeeded())
                .and_then(|r| r.error.clone());
            results.extend(batch_results);

            if let Some(error) = failure {
                // Any main-path failure aborts the run; remaining batches
                // are not computed.
                return (results, Some(error));
            }

            for id in &batch {
                processed.insert(*id);
                processed_order.push(*id);
            }

            let exit_reached = batch.iter().any(|id| {
                self.graph
                    .descriptor(id)
                    .map(|d| d.category == NodeCategory::Exit)
                    .unwrap_or(false)
            });
            if exit_reached {
                debug!(batch_index, "Exit node completed, stopping main path");
                break;
            }

            let mut next: Vec<&str> = Vec::new();
            for id in &processed_order {
                let Some(descriptor) = self.graph.descriptor(id) else {
                    continue;
                };
                for successor in &descriptor.next {
                    let successor = successor.as_str();
                    if !main_ids.contains(successor)
                        || processed.contains(successor)
                        || next.contains(&successor)
                    {
                        continue;
                    }
                    let ready = predecessors
                        .get(successor)
                        .map(|preds| preds.iter().all(|p| processed.contains(p)))
                        .unwrap_or(true);
                    if ready {
                        // Find the graph-owned &str so lifetimes line up.
                        if let Some(d) = self.graph.descriptor(successor) {
                            next.push(d.id.as_str());
                        }
                    }
                }
            }

            batch = next;
            batch_index += 1;
        }

        (results, None)
    }

    /// Execute one node, bounded by the per-node timeout when configured.
    async fn run_node(
        node: Arc<dyn WorkflowNode>,
        context: ExecutionContext,
        timeout_secs: Option<u64>,
    ) -> NodeExecutionResult {
        match timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), node.execute(&context)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        let err = ReverieError::NodeTimeout {
                            node: node.id().to_string(),
                            timeout_secs: secs,
                        };
                        warn!(node_id = %node.id(), timeout_secs = secs, "Node timed out");
                        NodeExecutionResult::failed(node.id(), err.to_string(), secs * 1000)
                    }
                }
            }
            None => node.execute(&context).await,
        }
    }

    /// Kick off the AFTER nodes against the same context.
    ///
    /// Fire-and-forget by default so side-effect work (memory extraction
    /// and the like) never delays the caller-visible response; awaited when
    /// the caller opts in. Failures are logged, never surfaced.
    async fn start_after_phase(&self, context: &ExecutionContext) {
        let after_nodes: Vec<Arc<dyn WorkflowNode>> = self
            .graph
            .nodes
            .iter()
            .filter(|d| d.category == NodeCategory::After)
            .filter_map(|d| self.nodes.get(&d.id).cloned())
            .collect();

        if after_nodes.is_empty() {
            return;
        }

        let context = context.clone();
        let timeout_secs = self.options.node_timeout_secs;

        if self.options.await_after_nodes {
            Self::after_phase(after_nodes, context, timeout_secs).await;
        } else {
            tokio::spawn(Self::after_phase(after_nodes, context, timeout_secs));
        }
    }

    async fn after_phase(
        nodes: Vec<Arc<dyn WorkflowNode>>,
        context: ExecutionContext,
        timeout_secs: Option<u64>,
    ) {
        debug!(count = nodes.len(), "Executing after-phase nodes");

        let futs: Vec<_> = nodes
            .into_iter()
            .map(|node| Self::run_node(node, context.clone(), timeout_secs))
            .collect();

        for result in join_all(futs).await {
            if !result.succeeded() {
                warn!(
                    node_id = %result.node_id,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "After-phase node failed (ignored)"
                );
            }
        }
    }
}
