//! Structured output of job-description parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::schema::{require_string, require_string_array, FieldViolation};
use crate::llm_client::ResponseSchema;

/// Everything the pipeline needs to know about the target role. Produced once
/// by the PARSE_JD step and treated as the reference requirement set by the
/// quality validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedJobDescription {
    pub company_name: String,
    pub role_title: String,
    pub required_skills: Vec<String>,
    pub nice_to_have: Vec<String>,
    pub tech_stack: Vec<String>,
    pub responsibilities: Vec<String>,
    pub seniority: String,
}

impl ParsedJobDescription {
    /// First whitespace-delimited token of the company name — the part a
    /// cover letter is expected to mention ("Acme" for "Acme Robotics Inc").
    pub fn company_first_token(&self) -> &str {
        self.company_name.split_whitespace().next().unwrap_or("")
    }
}

impl ResponseSchema for ParsedJobDescription {
    fn schema_check(value: &Value) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        require_string(value, "company_name", &mut out);
        require_string(value, "role_title", &mut out);
        require_string_array(value, "required_skills", &mut out);
        require_string_array(value, "nice_to_have", &mut out);
        require_string_array(value, "tech_stack", &mut out);
        require_string_array(value, "responsibilities", &mut out);
        require_string(value, "seniority", &mut out);
        out
    }
}
