// All LLM prompt constants for the pipeline nodes.
// Every template is filled with `.replace("{placeholder}", ...)` before sending.

/// Section headers the interview-prep artifact must carry. Shared with the
/// quality validator so the prompt and the gate cannot drift apart.
pub const INTERVIEW_SECTIONS: [&str; 3] =
    ["Likely Questions", "Questions to Ask", "Key Talking Points"];

pub const JD_PARSE_SYSTEM: &str =
    "You are an expert job description analyst. Parse a job description and \
    extract structured information. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// JD parsing prompt template. Replace `{jd_text}` before sending.
pub const JD_PARSE_TEMPLATE: &str = r#"Parse the following job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "company_name": "Acme Robotics",
  "role_title": "Senior Backend Engineer",
  "required_skills": ["Rust", "distributed systems"],
  "nice_to_have": ["Kubernetes"],
  "tech_stack": ["Rust", "Tokio", "PostgreSQL"],
  "responsibilities": ["Design and operate backend services"],
  "seniority": "senior"
}

Rules:
- required_skills: explicit must-haves — "required", "must have", minimum years.
- nice_to_have: "preferred", "bonus", "a plus".
- tech_stack: every concrete technology, language, framework or platform named anywhere.
- seniority: one of "junior", "mid", "senior", "staff", "unknown".

Job description:
{jd_text}"#;

pub const RESUME_PARSE_SYSTEM: &str =
    "You are an expert resume analyst. Extract a structured candidate profile \
    from raw resume text. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Resume parsing prompt template. Replace `{resume_text}` before sending.
pub const RESUME_PARSE_TEMPLATE: &str = r#"Parse the following resume.

Return a JSON object with this EXACT schema (no extra fields):
{
  "full_name": "Jordan Rivera",
  "summary": "One-paragraph professional summary in the candidate's voice",
  "skills": ["Rust", "PostgreSQL"],
  "experience": [
    {
      "title": "Senior Software Engineer",
      "organization": "Previous Co",
      "highlights": ["Led a latency reduction effort across 12 services"]
    }
  ],
  "education": ["B.S. Computer Science, State University"]
}

Keep highlights verbatim where possible — do not invent accomplishments.

Resume:
{resume_text}"#;

pub const FIT_SYSTEM: &str =
    "You are a career strategist comparing a candidate against a role. \
    Be honest about gaps; do not inflate the score. \
    You MUST respond with valid JSON only. Do NOT use markdown code fences.";

/// Fit analysis prompt template. Replace `{job_json}` and `{candidate_json}`.
pub const FIT_TEMPLATE: &str = r#"Compare the candidate against the role.

Return a JSON object with this EXACT schema (no extra fields):
{
  "overall_score": 72,
  "summary": "Two or three sentences on overall fit",
  "strengths": ["direct matches between the resume and the requirements"],
  "gaps": ["requirements the resume does not evidence"],
  "talking_points": ["angles the candidate should emphasise"]
}

overall_score is an integer 0-100.

Role (structured):
{job_json}

Candidate (structured):
{candidate_json}"#;

pub const COVER_LETTER_SYSTEM: &str =
    "You are an expert cover letter writer. Write in the candidate's voice, \
    grounded strictly in their real experience. \
    You MUST respond with valid JSON only: {\"content\": \"...\"}. \
    Do NOT use markdown code fences.";

/// Cover letter template. Replace `{job_json}`, `{candidate_json}`, `{fit_json}`.
pub const COVER_LETTER_TEMPLATE: &str = r#"Write a cover letter for this application.

Requirements:
- 200 to 400 words, three or four paragraphs.
- Address the company by name and name the role.
- Mention at least two of the required skills, evidenced from the resume.
- No fabricated experience, no generic filler.

Return JSON: {"content": "<the full cover letter>"}

Role:
{job_json}

Candidate:
{candidate_json}

Fit analysis:
{fit_json}"#;

pub const BULLETS_SYSTEM: &str =
    "You are an expert resume editor producing role-tailored bullet points. \
    You MUST respond with valid JSON only: {\"content\": \"...\"}. \
    Do NOT use markdown code fences.";

/// Tailored-bullets template. Replace `{job_json}` and `{candidate_json}`.
pub const BULLETS_TEMPLATE: &str = r#"Rewrite the candidate's experience as resume bullets tailored to this role.

Requirements:
- 5 to 8 bullets, one per line, each starting with "- ".
- Weave in the role's tech stack keywords where the resume supports them.
- Quantify impact wherever the source material allows.

Return JSON: {"content": "<bullet lines separated by newlines>"}

Role:
{job_json}

Candidate:
{candidate_json}"#;

pub const INTERVIEW_PREP_SYSTEM: &str =
    "You are an interview coach preparing a candidate for a specific company. \
    You MUST respond with valid JSON only: {\"content\": \"...\"}. \
    Do NOT use markdown code fences.";

/// Interview prep template. Replace `{job_json}`, `{candidate_json}`,
/// `{fit_json}` and `{sections}`.
pub const INTERVIEW_PREP_TEMPLATE: &str = r#"Write an interview preparation document for this application.

Requirements:
- Use EXACTLY these three section headers, in order: {sections}.
- Reference the company by name — no generic advice.
- Under "Likely Questions", cover the fit analysis gaps honestly.

Return JSON: {"content": "<the full document>"}

Role:
{job_json}

Candidate:
{candidate_json}

Fit analysis:
{fit_json}"#;
