//! Structured output of resume parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::schema::{require_string, require_string_array, FieldViolation};
use crate::llm_client::ResponseSchema;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub organization: String,
    pub highlights: Vec<String>,
}

/// The candidate as parsed from their resume by the PARSE_RESUME step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub full_name: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<String>,
}

impl ResponseSchema for CandidateProfile {
    fn schema_check(value: &Value) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        require_string(value, "full_name", &mut out);
        require_string(value, "summary", &mut out);
        require_string_array(value, "skills", &mut out);
        require_string_array(value, "education", &mut out);

        // Experience entries are nested objects; violations carry the
        // indexed path so a retry diagnostic points at the exact entry.
        match value.get("experience") {
            None | Some(Value::Null) => {
                out.push(FieldViolation::new("experience", "required field is missing"));
            }
            Some(Value::Array(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    for field in ["title", "organization"] {
                        match entry.get(field) {
                            None | Some(Value::Null) => out.push(FieldViolation::new(
                                format!("experience[{i}].{field}"),
                                "required field is missing",
                            )),
                            Some(Value::String(_)) => {}
                            Some(_) => out.push(FieldViolation::new(
                                format!("experience[{i}].{field}"),
                                "expected a string",
                            )),
                        }
                    }
                }
            }
            Some(_) => out.push(FieldViolation::new("experience", "expected an array")),
        }
        out
    }
}
