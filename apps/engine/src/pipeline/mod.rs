//! The agent execution pipeline: state model, context, graph, runner, nodes.

pub mod context;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod runner;
pub mod state;

pub use context::{PipelineContext, StateHistoryEntry, TokenUsage};
pub use graph::{AgentGraph, NodeHandler};
pub use nodes::MAX_VALIDATION_ATTEMPTS;
pub use runner::{run_graph, StateObserver};
pub use state::AgentState;
