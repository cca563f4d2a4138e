// Prompt templates for candidate scoring and job-description drafting.

/// System prompt for candidate scoring.
pub const SCORE_SYSTEM: &str = "You are an experienced technical recruiter \
    screening candidates against a job posting. \
    You MUST respond with a single valid JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies outside the JSON.";

/// Candidate scoring template. Replace `{job}`, `{candidate}` and `{fairness}`.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Score how well the candidate fits the job.

JOB POSTING:
{job}

CANDIDATE:
{candidate}

{fairness}

Return a JSON object with this EXACT schema:
{"score": <integer from 0 to 100>, "reason": "<one or two sentences>"}"#;

/// System prompt for drafting job descriptions.
pub const DESCRIBE_SYSTEM: &str = "You are a recruiter who writes clear, inclusive, \
    concise job descriptions. Respond with the description text only.";

/// Job-description template. Replace `{title}`, `{company}` and `{notes}`.
pub const DESCRIBE_PROMPT_TEMPLATE: &str = r#"Write a job description for the role below.
Include a short summary, responsibilities and requirements as bullet lists.

Title: {title}
Company: {company}
Hiring manager notes:
{notes}"#;
