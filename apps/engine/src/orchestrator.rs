//! Run-to-completion entry point.
//!
//! Composes the agent graph, a fresh context, and the shared model client
//! into a single `run` call. Each run owns a private context; the client and
//! parse cache are shared across runs of the same orchestrator but carry no
//! per-run state.

use std::sync::Arc;

use tracing::info;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::errors::EngineError;
use crate::llm_client::LlmClient;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::AgentGraph;
use crate::pipeline::nodes::{
    AnalyzeFitHandler, GenerateOutputsHandler, IntakeHandler, ParseJdHandler, ParseResumeHandler,
    ValidateHandler,
};
use crate::pipeline::runner::{run_graph, StateObserver};
use crate::pipeline::state::AgentState;

pub struct Orchestrator {
    llm: Arc<LlmClient>,
    cache: Arc<ContentCache>,
}

impl Orchestrator {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            cache: Arc::new(ContentCache::new()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let llm = if config.offline {
            LlmClient::offline()
        } else {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| EngineError::Input("ANTHROPIC_API_KEY is not set".to_string()))?;
            LlmClient::new(api_key)
        };
        Ok(Self::new(Arc::new(
            llm.with_retry_policy(config.llm_max_retries, config.llm_base_delay_ms),
        )))
    }

    /// The shared model client, for usage reporting after runs.
    pub fn llm(&self) -> &Arc<LlmClient> {
        &self.llm
    }

    fn build_graph(&self) -> AgentGraph {
        AgentGraph::new()
            .with_node(AgentState::Intake, Box::new(IntakeHandler))
            .with_node(
                AgentState::ParseJd,
                Box::new(ParseJdHandler {
                    llm: Arc::clone(&self.llm),
                    cache: Arc::clone(&self.cache),
                }),
            )
            .with_node(
                AgentState::ParseResume,
                Box::new(ParseResumeHandler {
                    llm: Arc::clone(&self.llm),
                    cache: Arc::clone(&self.cache),
                }),
            )
            .with_node(
                AgentState::AnalyzeFit,
                Box::new(AnalyzeFitHandler {
                    llm: Arc::clone(&self.llm),
                }),
            )
            .with_node(
                AgentState::GenerateOutputs,
                Box::new(GenerateOutputsHandler {
                    llm: Arc::clone(&self.llm),
                }),
            )
            .with_node(AgentState::Validate, Box::new(ValidateHandler))
    }

    /// Runs the pipeline to completion and returns the populated context.
    ///
    /// Handler failures end the run in ERROR but still return the context
    /// with whatever partial results were produced; only control-flow errors
    /// (a state with no registered handler) fail the call itself.
    pub async fn run(
        &self,
        job_text: impl Into<String>,
        resume_text: impl Into<String>,
        observer: Option<StateObserver<'_>>,
    ) -> Result<PipelineContext, EngineError> {
        let mut ctx = PipelineContext::new(job_text.into(), resume_text.into());
        let graph = self.build_graph();

        info!(run_id = %ctx.run_id, "starting pipeline run");
        run_graph(&graph, &mut ctx, AgentState::Intake, observer).await?;
        info!(
            run_id = %ctx.run_id,
            state = %ctx.current_state,
            attempts = ctx.validation_attempts,
            input_tokens = ctx.token_usage.input_tokens,
            output_tokens = ctx.token_usage.output_tokens,
            "pipeline run finished"
        );

        Ok(ctx)
    }
}
