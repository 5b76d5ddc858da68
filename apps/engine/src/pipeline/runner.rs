//! The graph execution loop.

use tracing::{info, warn};

use crate::errors::EngineError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::AgentGraph;
use crate::pipeline::state::AgentState;

/// Synchronous progress observer. Receives a live reference to the mutable
/// context and must treat it as read-only.
pub type StateObserver<'a> = &'a mut dyn FnMut(AgentState, &PipelineContext);

/// Drives `ctx` from `start` to a terminal state.
///
/// Per iteration: resolve the handler (failing fast with `MissingHandler`
/// before any side effect), record the history entry, notify the observer,
/// run the handler, and apply its returned state. A handler error is caught
/// exactly once here: it is recorded as `"<STATE>: <message>"` and the run
/// transitions to ERROR rather than failing the call. Callers inspect
/// `ctx.current_state` afterwards.
pub async fn run_graph(
    graph: &AgentGraph,
    ctx: &mut PipelineContext,
    start: AgentState,
    mut observer: Option<StateObserver<'_>>,
) -> Result<(), EngineError> {
    let mut state = start;

    while !graph.is_terminal(state) {
        let Some(handler) = graph.handler_for(state) else {
            return Err(EngineError::MissingHandler(state.to_string()));
        };

        ctx.current_state = state;
        ctx.enter_state(state);
        info!(run_id = %ctx.run_id, state = %state, "entering pipeline state");
        if let Some(cb) = observer.as_mut() {
            cb(state, ctx);
        }

        match handler.run(ctx).await {
            Ok(next) => state = next,
            Err(e) => {
                warn!(run_id = %ctx.run_id, state = %state, error = %e, "handler failed");
                ctx.errors.push(format!("{state}: {e}"));
                state = AgentState::Error;
            }
        }
    }

    ctx.current_state = state;
    ctx.enter_state(state);
    info!(run_id = %ctx.run_id, state = %state, "pipeline reached terminal state");
    if let Some(cb) = observer.as_mut() {
        cb(state, ctx);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::graph::NodeHandler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Always returns the same successor.
    struct Step(AgentState);

    #[async_trait]
    impl NodeHandler for Step {
        async fn run(&self, _ctx: &mut PipelineContext) -> Result<AgentState, EngineError> {
            Ok(self.0)
        }
    }

    struct Boom;

    #[async_trait]
    impl NodeHandler for Boom {
        async fn run(&self, _ctx: &mut PipelineContext) -> Result<AgentState, EngineError> {
            Err(EngineError::Internal(anyhow::anyhow!("boom")))
        }
    }

    /// Counts invocations, then returns the successor.
    struct Counting {
        next: AgentState,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl NodeHandler for Counting {
        async fn run(&self, _ctx: &mut PipelineContext) -> Result<AgentState, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.next)
        }
    }

    /// Fails validation on the first visit, passes on the second.
    struct FlakyGate {
        visits: Arc<AtomicU32>,
    }

    #[async_trait]
    impl NodeHandler for FlakyGate {
        async fn run(&self, _ctx: &mut PipelineContext) -> Result<AgentState, EngineError> {
            if self.visits.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(AgentState::GenerateOutputs)
            } else {
                Ok(AgentState::Done)
            }
        }
    }

    fn ctx() -> PipelineContext {
        PipelineContext::new("job".into(), "resume".into())
    }

    #[tokio::test]
    async fn test_linear_chain_visits_states_in_order() {
        let graph = AgentGraph::new()
            .with_node(AgentState::Intake, Box::new(Step(AgentState::ParseJd)))
            .with_node(AgentState::ParseJd, Box::new(Step(AgentState::ParseResume)))
            .with_node(AgentState::ParseResume, Box::new(Step(AgentState::Done)));

        let mut ctx = ctx();
        run_graph(&graph, &mut ctx, AgentState::Intake, None)
            .await
            .unwrap();

        assert_eq!(ctx.current_state, AgentState::Done);
        let visited: Vec<AgentState> = ctx.state_history.iter().map(|e| e.state).collect();
        assert_eq!(
            visited,
            vec![
                AgentState::Intake,
                AgentState::ParseJd,
                AgentState::ParseResume,
                AgentState::Done
            ]
        );
        // 1 initial entry + 3 transitions.
        assert_eq!(ctx.state_history.len(), 4);
        // Every entry but the terminal one has its duration closed.
        assert!(ctx.state_history[..3].iter().all(|e| e.duration_ms.is_some()));
        assert!(ctx.state_history[3].duration_ms.is_none());
    }

    #[tokio::test]
    async fn test_observer_fires_once_per_visited_state_in_order() {
        let graph = AgentGraph::new()
            .with_node(AgentState::Intake, Box::new(Step(AgentState::ParseJd)))
            .with_node(AgentState::ParseJd, Box::new(Step(AgentState::Done)));

        let mut seen = Vec::new();
        let mut observer = |state: AgentState, _ctx: &PipelineContext| seen.push(state);
        let mut ctx = ctx();
        run_graph(&graph, &mut ctx, AgentState::Intake, Some(&mut observer))
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![AgentState::Intake, AgentState::ParseJd, AgentState::Done]
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_recorded_and_run_ends_in_error() {
        let graph = AgentGraph::new()
            .with_node(AgentState::Intake, Box::new(Step(AgentState::ParseJd)))
            .with_node(AgentState::ParseJd, Box::new(Boom));

        let mut ctx = ctx();
        run_graph(&graph, &mut ctx, AgentState::Intake, None)
            .await
            .unwrap();

        assert_eq!(ctx.current_state, AgentState::Error);
        assert_eq!(ctx.errors, vec!["PARSE_JD: boom".to_string()]);
        assert_eq!(
            ctx.state_history.last().map(|e| e.state),
            Some(AgentState::Error)
        );
    }

    #[tokio::test]
    async fn test_missing_start_handler_rejects_without_mutation() {
        let graph = AgentGraph::new();
        let mut ctx = ctx();
        let err = run_graph(&graph, &mut ctx, AgentState::Intake, None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No handler registered for state: INTAKE");
        assert_eq!(ctx.state_history.len(), 1);
        assert!(ctx.errors.is_empty());
        assert_eq!(ctx.current_state, AgentState::Intake);
    }

    #[tokio::test]
    async fn test_missing_mid_run_handler_fails_fast() {
        let graph = AgentGraph::new()
            .with_node(AgentState::Intake, Box::new(Step(AgentState::ParseJd)));
        let mut ctx = ctx();
        let err = run_graph(&graph, &mut ctx, AgentState::Intake, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No handler registered for state: PARSE_JD");
    }

    #[tokio::test]
    async fn test_generate_validate_cycle_runs_generation_twice() {
        let generations = Arc::new(AtomicU32::new(0));
        let visits = Arc::new(AtomicU32::new(0));
        let graph = AgentGraph::new()
            .with_node(
                AgentState::GenerateOutputs,
                Box::new(Counting {
                    next: AgentState::Validate,
                    calls: Arc::clone(&generations),
                }),
            )
            .with_node(
                AgentState::Validate,
                Box::new(FlakyGate {
                    visits: Arc::clone(&visits),
                }),
            );

        let mut ctx = ctx();
        run_graph(&graph, &mut ctx, AgentState::GenerateOutputs, None)
            .await
            .unwrap();

        assert_eq!(ctx.current_state, AgentState::Done);
        assert_eq!(generations.load(Ordering::SeqCst), 2);
        assert_eq!(visits.load(Ordering::SeqCst), 2);
    }
}
