//! Generated artifacts and the quality verdict over them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::schema::{require_string, FieldViolation};
use crate::llm_client::ResponseSchema;

/// The three artifacts the pipeline produces. Each field is independently
/// overwritable: a validation retry regenerates only the invalid ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedOutputs {
    pub cover_letter: Option<String>,
    pub resume_bullets: Option<String>,
    pub interview_prep: Option<String>,
}

impl GeneratedOutputs {
    pub fn is_complete(&self) -> bool {
        self.cover_letter.is_some() && self.resume_bullets.is_some() && self.interview_prep.is_some()
    }
}

/// Verdict of the quality validator. `passed` is always the conjunction of
/// the per-artifact flags; construct through `new` to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub cover_letter_valid: bool,
    pub bullets_valid: bool,
    pub interview_prep_valid: bool,
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn new(
        cover_letter_valid: bool,
        bullets_valid: bool,
        interview_prep_valid: bool,
        issues: Vec<String>,
    ) -> Self {
        Self {
            passed: cover_letter_valid && bullets_valid && interview_prep_valid,
            cover_letter_valid,
            bullets_valid,
            interview_prep_valid,
            issues,
        }
    }
}

/// Wire shape for a single generated artifact. The generation prompts ask
/// for `{"content": "..."}` so the structured-call path (schema check, retry,
/// usage accounting) is identical for every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftArtifact {
    pub content: String,
}

impl ResponseSchema for DraftArtifact {
    fn schema_check(value: &Value) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        require_string(value, "content", &mut out);
        out
    }
}
