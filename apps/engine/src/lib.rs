//! Application-kit agent engine.
//!
//! Takes a job description and a resume, drives an LLM-backed pipeline
//! (parse → fit analysis → generation → quality gate) to completion, and
//! returns a context holding the three tailored artifacts: a cover letter,
//! resume bullets, and an interview-prep document.
//!
//! The quality gate retries generation once, regenerating only the artifacts
//! it flagged; after that the run completes best-effort with the remaining
//! issues stored on the context. A run that reaches `DONE` therefore does
//! not imply the gate passed — check `PipelineContext::validation_passed`.

pub mod cache;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod llm_client;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod quality;

pub use cache::ContentCache;
pub use config::Config;
pub use errors::EngineError;
pub use llm_client::{LlmClient, LlmError, UsageSummary};
pub use models::{
    CandidateProfile, FitAnalysis, GeneratedOutputs, ParsedJobDescription, ValidationResult,
};
pub use orchestrator::Orchestrator;
pub use pipeline::{AgentGraph, AgentState, NodeHandler, PipelineContext};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes structured logging with `RUST_LOG` or the given default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
