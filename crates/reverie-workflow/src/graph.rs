use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use reverie_core::error::{Result, ReverieError};
use reverie_core::types::NodeCategory;

use crate::node::{NodeDescriptor, WorkflowNode};

/// Declarative workflow configuration: an ordered list of node descriptors.
///
/// Immutable once validated. Ordinarily produced by static application
/// configuration (JSON/TOML), not persisted or transmitted externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeDescriptor>,
}

impl WorkflowGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>, nodes: Vec<NodeDescriptor>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes,
        }
    }

    /// Look up a descriptor by node id.
    pub fn descriptor(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|d| d.id == id)
    }

    /// Ids of the nodes that start the run.
    ///
    /// Explicitly marked Entry nodes win; when a graph marks none, every
    /// main-path node that no other main-path node lists as a successor is
    /// treated as an entry.
    pub fn entry_ids(&self) -> Vec<&str> {
        let explicit: Vec<&str> = self
            .nodes
            .iter()
            .filter(|d| d.category == NodeCategory::Entry)
            .map(|d| d.id.as_str())
            .collect();

        if !explicit.is_empty() {
            return explicit;
        }

        let referenced: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|d| d.category != NodeCategory::After)
            .flat_map(|d| d.next.iter().map(|s| s.as_str()))
            .collect();

        self.nodes
            .iter()
            .filter(|d| d.category != NodeCategory::After && !referenced.contains(d.id.as_str()))
            .map(|d| d.id.as_str())
            .collect()
    }
}

type NodeFactory = Box<dyn Fn(&NodeDescriptor) -> Arc<dyn WorkflowNode> + Send + Sync>;

/// Caller-supplied map from implementation names to node constructors.
///
/// Factories receive the descriptor and build the node, injecting whatever
/// tool handles the implementation needs at construction time. Like the
/// tool registry, re-registering a name is last-write-wins.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for an implementation name.
    pub fn register<F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        F: Fn(&NodeDescriptor) -> Arc<dyn WorkflowNode> + Send + Sync + 'static,
    {
        let name = implementation.into();
        if self
            .factories
            .insert(name.clone(), Box::new(factory))
            .is_some()
        {
            debug!(implementation = %name, "Node factory re-registered");
        }
    }

    /// List registered implementation names.
    pub fn list(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Construct every node in a graph, keyed by node id.
    ///
    /// Fails with `UnknownNodeImplementation` for names no factory covers
    /// and `DuplicateNodeId` for repeated descriptor ids, so a misconfigured
    /// graph surfaces at construction rather than mid-run.
    pub fn instantiate(
        &self,
        graph: &WorkflowGraph,
    ) -> Result<HashMap<String, Arc<dyn WorkflowNode>>> {
        let mut nodes: HashMap<String, Arc<dyn WorkflowNode>> = HashMap::new();

        for descriptor in &graph.nodes {
            let factory = self.factories.get(&descriptor.implementation).ok_or_else(|| {
                ReverieError::UnknownNodeImplementation(descriptor.implementation.clone())
            })?;

            if nodes
                .insert(descriptor.id.clone(), factory(descriptor))
                .is_some()
            {
                return Err(ReverieError::DuplicateNodeId(descriptor.id.clone()));
            }
        }

        Ok(nodes)
    }
}
