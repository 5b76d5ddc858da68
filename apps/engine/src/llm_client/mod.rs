//! Resilient model-call layer — the single point of entry for all LLM calls.
//!
//! ARCHITECTURAL RULE: no pipeline node may call the model API directly.
//! Every step goes through `LlmClient::structured_call`, which adds retry
//! with exponential backoff and jitter, code-fence stripping, JSON parsing,
//! schema checking with per-field diagnostics, and per-instance usage
//! accounting.
//!
//! Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent
//! drift). Cost rates live next to the model id for the same reason.

use std::sync::Mutex;
use std::time::Instant;

use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod schema;
pub mod transport;

pub use schema::{join_violations, FieldViolation, ResponseSchema};
pub use transport::{HttpTransport, ModelReply, ModelTransport};

/// The model used for all LLM calls.
pub const MODEL: &str = "claude-sonnet-4-5";
pub(crate) const MAX_TOKENS: u32 = 4096;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const MAX_JITTER_MS: u64 = 1000;

/// Schema failures are retried, but become fatal once this attempt index is
/// reached (i.e. after two retries have already been burned on them).
const SCHEMA_FATAL_ATTEMPT: u32 = 2;

/// USD per million tokens, Sonnet pricing.
const INPUT_COST_PER_MTOK: f64 = 3.0;
const OUTPUT_COST_PER_MTOK: f64 = 15.0;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API key: the model API rejected the credential (HTTP 401). Set ANTHROPIC_API_KEY to a valid key and try again.")]
    InvalidApiKey,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    /// A single schema-check failure; retried unless the attempt budget for
    /// schema errors is exhausted.
    #[error("Schema validation failed: {0}")]
    Schema(String),

    /// Terminal schema failure, carrying every violated field path and rule.
    #[error("Schema validation failed after retries: {0}")]
    SchemaExhausted(String),

    #[error("offline mode requires a fallback value for structured calls")]
    MissingFallback,
}

/// Token usage reported by the API for one call attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Reduction of an instance's private usage log.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct UsageSummary {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_calls: u64,
    pub estimated_cost: f64,
}

/// A schema-valid structured response plus its call metadata.
#[derive(Debug, Clone)]
pub struct Structured<T> {
    pub data: T,
    pub usage: UsageRecord,
    pub duration_ms: u64,
}

enum CallMode {
    Live(Box<dyn ModelTransport>),
    /// Deterministic testing/demo path: no network, fallback values only.
    Offline,
}

/// The resilient model-call client.
///
/// Usage accounting is scoped to the instance: two clients never see each
/// other's counts, so concurrent runs stay isolated.
pub struct LlmClient {
    mode: CallMode,
    max_retries: u32,
    base_delay_ms: u64,
    usage_log: Mutex<Vec<UsageRecord>>,
}

impl LlmClient {
    /// Live client against the Anthropic API.
    pub fn new(api_key: String) -> Self {
        Self::with_transport(Box::new(HttpTransport::new(api_key)))
    }

    /// Live client over an arbitrary transport (scripted fakes in tests).
    pub fn with_transport(transport: Box<dyn ModelTransport>) -> Self {
        Self {
            mode: CallMode::Live(transport),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            usage_log: Mutex::new(Vec::new()),
        }
    }

    /// Offline client: `structured_call` validates and returns the provided
    /// fallback value with zero usage, never touching the network.
    pub fn offline() -> Self {
        Self {
            mode: CallMode::Offline,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            usage_log: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the retry policy. A base delay of zero disables backoff
    /// sleeps entirely.
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.mode, CallMode::Offline)
    }

    /// Calls the model and returns schema-valid structured output.
    ///
    /// The live path attempts up to `max_retries + 1` times, sleeping
    /// `base_delay_ms * 2^attempt` plus up to 1s of jitter before each retry.
    /// An invalid credential aborts immediately; schema failures escalate to
    /// `SchemaExhausted` once the schema attempt budget is spent; everything
    /// else retries until the budget runs out and the last error is re-raised.
    pub async fn structured_call<T: ResponseSchema>(
        &self,
        prompt: &str,
        system: &str,
        fallback: Option<Value>,
    ) -> Result<Structured<T>, LlmError> {
        let started = Instant::now();

        let transport = match &self.mode {
            CallMode::Live(transport) => transport,
            CallMode::Offline => {
                // Same schema rule as the live path — the fallback gets no
                // special-casing of shape.
                let value = fallback.ok_or(LlmError::MissingFallback)?;
                let violations = T::schema_check(&value);
                if !violations.is_empty() {
                    return Err(LlmError::Schema(join_violations(&violations)));
                }
                let data: T = serde_json::from_value(value)?;
                return Ok(Structured {
                    data,
                    usage: UsageRecord::default(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 && self.base_delay_ms > 0 {
                let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
                let delay_ms = self.base_delay_ms * (1u64 << attempt) + jitter;
                warn!(attempt, delay_ms, "LLM call failed, backing off before retry");
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }

            let reply = match transport.complete(prompt, system).await {
                Ok(reply) => reply,
                // Authentication failure is fatal: retrying cannot fix it.
                Err(LlmError::InvalidApiKey) => return Err(LlmError::InvalidApiKey),
                Err(e) => {
                    warn!(attempt, error = %e, "LLM call attempt failed");
                    last_error = Some(e);
                    continue;
                }
            };

            // Every attempt that got a usage record back counts, even if the
            // payload turns out to be invalid below.
            self.record_usage(reply.usage);

            let text = strip_code_fences(&reply.text);
            let value: Value = match serde_json::from_str(text) {
                Ok(v) => v,
                Err(e) => {
                    warn!(attempt, error = %e, "model returned malformed JSON");
                    last_error = Some(LlmError::Parse(e));
                    continue;
                }
            };

            let violations = T::schema_check(&value);
            if !violations.is_empty() {
                let joined = join_violations(&violations);
                if attempt >= SCHEMA_FATAL_ATTEMPT {
                    return Err(LlmError::SchemaExhausted(joined));
                }
                warn!(attempt, violations = %joined, "model output failed schema check");
                last_error = Some(LlmError::Schema(joined));
                continue;
            }

            let data: T = match serde_json::from_value(value) {
                Ok(data) => data,
                Err(e) => {
                    warn!(attempt, error = %e, "schema-valid JSON failed typed decode");
                    last_error = Some(LlmError::Parse(e));
                    continue;
                }
            };

            debug!(
                attempt,
                input_tokens = reply.usage.input_tokens,
                output_tokens = reply.usage.output_tokens,
                "structured LLM call succeeded"
            );

            return Ok(Structured {
                data,
                usage: reply.usage,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }

    /// Reduces the instance's usage log into totals and an estimated cost.
    pub fn usage_summary(&self) -> UsageSummary {
        let log = self.usage_log.lock().expect("usage log lock poisoned");
        let total_input_tokens: u64 = log.iter().map(|u| u.input_tokens).sum();
        let total_output_tokens: u64 = log.iter().map(|u| u.output_tokens).sum();
        UsageSummary {
            total_input_tokens,
            total_output_tokens,
            total_calls: log.len() as u64,
            estimated_cost: total_input_tokens as f64 / 1_000_000.0 * INPUT_COST_PER_MTOK
                + total_output_tokens as f64 / 1_000_000.0 * OUTPUT_COST_PER_MTOK,
        }
    }

    fn record_usage(&self, usage: UsageRecord) {
        self.usage_log
            .lock()
            .expect("usage log lock poisoned")
            .push(usage);
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_start();
    body.strip_suffix("```").map(str::trim_end).unwrap_or(body)
}
