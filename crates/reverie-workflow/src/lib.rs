pub mod context;
pub mod engine;
pub mod graph;
pub mod node;

pub use context::ExecutionContext;
pub use engine::{ExecutionOptions, WorkflowEngine};
pub use graph::{NodeRegistry, WorkflowGraph};
pub use node::{FnNode, NodeDescriptor, WorkflowNode};
