//! The state → handler registry.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::AgentState;

/// A unit of work bound to one state. The returned state is authoritative:
/// the runner applies it without consulting a transition table.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<AgentState, EngineError>;
}

/// Immutable-after-build map of state → handler plus the terminal-state set.
pub struct AgentGraph {
    nodes: HashMap<AgentState, Box<dyn NodeHandler>>,
    terminal_states: HashSet<AgentState>,
}

impl AgentGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            terminal_states: HashSet::from([AgentState::Done, AgentState::Error]),
        }
    }

    /// Registers a handler for a state. Builder-style so construction reads
    /// as one expression and the finished graph is never mutated.
    pub fn with_node(mut self, state: AgentState, handler: Box<dyn NodeHandler>) -> Self {
        self.nodes.insert(state, handler);
        self
    }

    pub fn handler_for(&self, state: AgentState) -> Option<&dyn NodeHandler> {
        self.nodes.get(&state).map(Box::as_ref)
    }

    pub fn is_terminal(&self, state: AgentState) -> bool {
        self.terminal_states.contains(&state)
    }
}

impl Default for AgentGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(AgentState);

    #[async_trait]
    impl NodeHandler for Stub {
        async fn run(&self, _ctx: &mut PipelineContext) -> Result<AgentState, EngineError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_lookup_and_terminal_set() {
        let graph = AgentGraph::new().with_node(AgentState::Intake, Box::new(Stub(AgentState::Done)));
        assert!(graph.handler_for(AgentState::Intake).is_some());
        assert!(graph.handler_for(AgentState::ParseJd).is_none());
        assert!(graph.is_terminal(AgentState::Done));
        assert!(graph.is_terminal(AgentState::Error));
        assert!(!graph.is_terminal(AgentState::Intake));
    }
}
