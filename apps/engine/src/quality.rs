//! Quality validator for generated artifacts.
//!
//! Pure function over the outputs and the parsed job description — no I/O,
//! no hidden state, byte-identical results on identical inputs. Every
//! violated predicate appends one issue; an artifact's flag flips on the
//! first violation but evaluation continues so the full issue list comes
//! back in one pass.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{GeneratedOutputs, ParsedJobDescription, ValidationResult};
use crate::pipeline::prompts::INTERVIEW_SECTIONS;

pub const COVER_LETTER_MIN_WORDS: usize = 150;
pub const COVER_LETTER_MAX_WORDS: usize = 450;
pub const MIN_BULLET_LINES: usize = 4;
pub const MIN_TECH_KEYWORDS: usize = 2;

/// Validates the three artifacts against the reference requirement set.
pub fn validate_outputs(
    outputs: &GeneratedOutputs,
    job: &ParsedJobDescription,
) -> ValidationResult {
    let mut issues = Vec::new();
    let cover_letter_valid = check_cover_letter(outputs.cover_letter.as_deref(), job, &mut issues);
    let bullets_valid = check_bullets(outputs.resume_bullets.as_deref(), job, &mut issues);
    let interview_prep_valid =
        check_interview_prep(outputs.interview_prep.as_deref(), job, &mut issues);

    let result = ValidationResult::new(
        cover_letter_valid,
        bullets_valid,
        interview_prep_valid,
        issues,
    );
    debug!(
        passed = result.passed,
        issues = result.issues.len(),
        "quality validation complete"
    );
    result
}

fn check_cover_letter(
    text: Option<&str>,
    job: &ParsedJobDescription,
    issues: &mut Vec<String>,
) -> bool {
    let Some(text) = text else {
        issues.push("cover letter: missing".to_string());
        return false;
    };
    let mut valid = true;

    let words = text.split_whitespace().count();
    if !(COVER_LETTER_MIN_WORDS..=COVER_LETTER_MAX_WORDS).contains(&words) {
        issues.push(format!(
            "cover letter: {words} words, expected between {COVER_LETTER_MIN_WORDS} and {COVER_LETTER_MAX_WORDS}"
        ));
        valid = false;
    }

    let lower = text.to_lowercase();
    let company_token = job.company_first_token().to_lowercase();
    if !company_token.is_empty() && !lower.contains(&company_token) {
        issues.push(format!(
            "cover letter: does not mention the company name ({})",
            job.company_name
        ));
        valid = false;
    }

    if !job.required_skills.is_empty()
        && !job
            .required_skills
            .iter()
            .any(|skill| lower.contains(&skill.to_lowercase()))
    {
        issues.push("cover letter: does not mention any required skill".to_string());
        valid = false;
    }

    valid
}

fn check_bullets(
    text: Option<&str>,
    job: &ParsedJobDescription,
    issues: &mut Vec<String>,
) -> bool {
    let Some(text) = text else {
        issues.push("resume bullets: missing".to_string());
        return false;
    };
    let mut valid = true;

    let bullet_lines = text.lines().filter(|line| is_bullet_line(line)).count();
    if bullet_lines < MIN_BULLET_LINES {
        issues.push(format!(
            "resume bullets: only {bullet_lines} bullet lines, expected at least {MIN_BULLET_LINES}"
        ));
        valid = false;
    }

    let lower = text.to_lowercase();
    let matched: HashSet<String> = job
        .tech_stack
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .filter(|keyword| lower.contains(keyword.as_str()))
        .collect();
    if matched.len() < MIN_TECH_KEYWORDS {
        issues.push(format!(
            "resume bullets: only {} distinct tech-stack keywords found, expected at least {MIN_TECH_KEYWORDS}",
            matched.len()
        ));
        valid = false;
    }

    valid
}

fn check_interview_prep(
    text: Option<&str>,
    job: &ParsedJobDescription,
    issues: &mut Vec<String>,
) -> bool {
    let Some(text) = text else {
        issues.push("interview prep: missing".to_string());
        return false;
    };
    let mut valid = true;

    for section in INTERVIEW_SECTIONS {
        if !text.contains(section) {
            issues.push(format!("interview prep: missing section header '{section}'"));
            valid = false;
        }
    }

    // No company mention reads as generic, reusable output — reject it.
    if !text.to_lowercase().contains(&job.company_name.to_lowercase()) {
        issues.push(format!(
            "interview prep: does not mention {} (generic output)",
            job.company_name
        ));
        valid = false;
    }

    valid
}

fn is_bullet_line(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('-' | '•' | '*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ParsedJobDescription {
        ParsedJobDescription {
            company_name: "Northwind Labs".to_string(),
            role_title: "Senior Backend Engineer".to_string(),
            required_skills: vec!["Rust".to_string(), "distributed systems".to_string()],
            nice_to_have: vec![],
            tech_stack: vec![
                "Rust".to_string(),
                "Tokio".to_string(),
                "PostgreSQL".to_string(),
            ],
            responsibilities: vec![],
            seniority: "senior".to_string(),
        }
    }

    fn valid_cover_letter() -> String {
        let body = "I am writing to apply to Northwind for the backend role. \
            My recent work has centered on Rust services under real production load, \
            and I believe that experience maps directly onto what your team is building. ";
        let mut text = String::new();
        while text.split_whitespace().count() < COVER_LETTER_MIN_WORDS + 10 {
            text.push_str(body);
        }
        text
    }

    fn valid_bullets() -> String {
        "- Built ingestion services in Rust handling 40k events per second\n\
         - Cut p99 latency 35% by reworking Tokio task scheduling\n\
         - Designed PostgreSQL schema migrations with zero downtime\n\
         - Led a three-person team through an on-call reliability overhaul\n\
         - Shipped a metrics pipeline adopted by four product teams"
            .to_string()
    }

    fn valid_prep() -> String {
        format!(
            "Preparation for Northwind Labs\n\n{}\n- Why move from your current role?\n\n{}\n- How does the team measure reliability?\n\n{}\n- Lead with the latency work.",
            INTERVIEW_SECTIONS[0], INTERVIEW_SECTIONS[1], INTERVIEW_SECTIONS[2]
        )
    }

    fn all_valid() -> GeneratedOutputs {
        GeneratedOutputs {
            cover_letter: Some(valid_cover_letter()),
            resume_bullets: Some(valid_bullets()),
            interview_prep: Some(valid_prep()),
        }
    }

    #[test]
    fn test_all_valid_outputs_pass() {
        let result = validate_outputs(&all_valid(), &job());
        assert!(result.passed, "issues: {:?}", result.issues);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_short_cover_letter_flips_only_its_flag() {
        let mut outputs = all_valid();
        outputs.cover_letter = Some("Too short but mentions Northwind and Rust.".to_string());
        let result = validate_outputs(&outputs, &job());
        assert!(!result.passed);
        assert!(!result.cover_letter_valid);
        assert!(result.bullets_valid);
        assert!(result.interview_prep_valid);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("words"));
    }

    #[test]
    fn test_cover_letter_collects_every_violation() {
        let mut outputs = all_valid();
        outputs.cover_letter = Some("Dear team, here is a very generic letter.".to_string());
        let result = validate_outputs(&outputs, &job());
        // Too short, no company token, no required skill — all three reported.
        let cover_issues: Vec<&String> = result
            .issues
            .iter()
            .filter(|i| i.starts_with("cover letter"))
            .collect();
        assert_eq!(cover_issues.len(), 3);
    }

    #[test]
    fn test_missing_artifacts_each_report_one_issue() {
        let result = validate_outputs(&GeneratedOutputs::default(), &job());
        assert!(!result.passed);
        assert_eq!(result.issues.len(), 3);
        assert!(result.issues.iter().all(|i| i.ends_with("missing")));
    }

    #[test]
    fn test_bullets_need_marker_lines_and_keywords() {
        let mut outputs = all_valid();
        outputs.resume_bullets = Some(
            "Shipped software with Rust and Tokio.\nDid other things.\n- one bullet".to_string(),
        );
        let result = validate_outputs(&outputs, &job());
        assert!(!result.bullets_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("bullet lines")));
        // Keywords were present, so only the line-count issue fires.
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_interview_prep_missing_section_and_company() {
        let mut outputs = all_valid();
        outputs.interview_prep = Some(format!(
            "{}\n- q1\n\n{}\n- q2",
            INTERVIEW_SECTIONS[0], INTERVIEW_SECTIONS[1]
        ));
        let result = validate_outputs(&outputs, &job());
        assert!(!result.interview_prep_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains(INTERVIEW_SECTIONS[2])));
        assert!(result.issues.iter().any(|i| i.contains("generic output")));
    }

    #[test]
    fn test_company_mention_is_case_insensitive() {
        let mut outputs = all_valid();
        outputs.cover_letter = Some(valid_cover_letter().to_uppercase());
        let result = validate_outputs(&outputs, &job());
        assert!(result.cover_letter_valid, "issues: {:?}", result.issues);
    }

    #[test]
    fn test_validator_is_idempotent() {
        let outputs = all_valid();
        let first = validate_outputs(&outputs, &job());
        let second = validate_outputs(&outputs, &job());
        assert_eq!(first, second);
    }
}
