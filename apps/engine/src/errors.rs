use thiserror::Error;

use crate::llm_client::LlmError;

/// Engine-level error type, shared by all pipeline handlers and the runner.
///
/// Handler failures are caught exactly once, at the runner, which records
/// `"<STATE>: <message>"` in the context and transitions to ERROR. Control-flow
/// errors (`MissingHandler`) are the only way `run_graph` itself fails.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No handler registered for state: {0}")]
    MissingHandler(String),

    #[error("Invalid input: {0}")]
    Input(String),

    /// A handler ran before the step that populates its input. This is a
    /// graph-wiring defect, not a runtime condition.
    #[error("Missing pipeline data: {0}")]
    MissingData(&'static str),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
