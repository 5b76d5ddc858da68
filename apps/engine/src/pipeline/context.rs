//! The mutable record threaded through a pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::llm_client::UsageRecord;
use crate::models::{
    CandidateProfile, FitAnalysis, GeneratedOutputs, ParsedJobDescription, ValidationResult,
};
use crate::pipeline::state::AgentState;

/// One visit to a state. `duration_ms` is closed out when the next
/// transition enters its own entry, and never altered afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct StateHistoryEntry {
    pub state: AgentState,
    pub entered_at: DateTime<Utc>,
    pub duration_ms: Option<u64>,
}

/// Per-run token accounting, accumulated by the handlers.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, usage: UsageRecord) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
    }
}

/// The single mutable record carrying a run's inputs, intermediate and final
/// results, and metadata.
///
/// The orchestrator owns creation and lifetime; handlers borrow it for one
/// invocation each and mutate it in place. A failed run still carries every
/// partial result produced before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineContext {
    pub run_id: Uuid,
    pub job_text: String,
    pub resume_text: String,
    pub parsed_job: Option<ParsedJobDescription>,
    pub parsed_candidate: Option<CandidateProfile>,
    pub fit_analysis: Option<FitAnalysis>,
    pub outputs: GeneratedOutputs,
    pub validation: Option<ValidationResult>,
    /// Monotonic; never reset within a run.
    pub validation_attempts: u32,
    pub current_state: AgentState,
    pub state_history: Vec<StateHistoryEntry>,
    pub errors: Vec<String>,
    pub token_usage: TokenUsage,
}

impl PipelineContext {
    pub fn new(job_text: String, resume_text: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_text,
            resume_text,
            parsed_job: None,
            parsed_candidate: None,
            fit_analysis: None,
            outputs: GeneratedOutputs::default(),
            validation: None,
            validation_attempts: 0,
            current_state: AgentState::Intake,
            state_history: vec![StateHistoryEntry {
                state: AgentState::Intake,
                entered_at: Utc::now(),
                duration_ms: None,
            }],
            errors: Vec::new(),
            token_usage: TokenUsage::default(),
        }
    }

    /// Appends a history entry for `state`, closing out the duration of the
    /// previous entry. The entry the constructor seeded for the start state
    /// is reused rather than duplicated.
    pub(crate) fn enter_state(&mut self, state: AgentState) {
        let now = Utc::now();
        if let Some(last) = self.state_history.last_mut() {
            if last.duration_ms.is_none() {
                if last.state == state {
                    return;
                }
                last.duration_ms =
                    Some((now - last.entered_at).num_milliseconds().max(0) as u64);
            }
        }
        self.state_history.push(StateHistoryEntry {
            state,
            entered_at: now,
            duration_ms: None,
        });
    }

    /// Whether the run reached DONE. Note: best-effort completion means this
    /// does not imply the quality gate passed — check `validation_passed`.
    pub fn succeeded(&self) -> bool {
        self.current_state == AgentState::Done
    }

    pub fn validation_passed(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.passed)
    }
}
