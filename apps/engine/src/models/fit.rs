//! Structured output of the fit-analysis step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::schema::{
    require_number_in_range, require_string, require_string_array, FieldViolation,
};
use crate::llm_client::ResponseSchema;

/// How well the candidate matches the role, as judged by the ANALYZE_FIT
/// step. Feeds the generation prompts; the score is informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitAnalysis {
    /// 0–100.
    pub overall_score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub talking_points: Vec<String>,
}

impl ResponseSchema for FitAnalysis {
    fn schema_check(value: &Value) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        require_number_in_range(value, "overall_score", 0.0, 100.0, &mut out);
        require_string(value, "summary", &mut out);
        require_string_array(value, "strengths", &mut out);
        require_string_array(value, "gaps", &mut out);
        require_string_array(value, "talking_points", &mut out);
        out
    }
}
