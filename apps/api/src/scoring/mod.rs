//! Candidate scoring — rates an applicant against a posting via the LLM.
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`; `LlmCandidateScorer` is
//! the production backend.

use async_trait::async_trait;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::FAIRNESS_INSTRUCTION;
use crate::llm_client::LlmClient;
use crate::models::JobPosting;
use crate::scoring::prompts::{
    DESCRIBE_PROMPT_TEMPLATE, DESCRIBE_SYSTEM, SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM,
};
use crate::text::{collapse_whitespace, truncate_chars};

pub mod handlers;
pub mod parse;
pub mod prompts;

pub use parse::{parse_score_response, ScoreResult, ScoreSource};

/// Budget for the job half of the scoring prompt.
pub const MAX_JOB_CHARS: usize = 2000;
/// Budget for the candidate half of the scoring prompt.
pub const MAX_CANDIDATE_CHARS: usize = 3000;
const SCORE_MAX_TOKENS: u32 = 300;
const DESCRIBE_MAX_TOKENS: u32 = 1500;

#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(&self, job: &JobPosting, candidate: &str) -> Result<ScoreResult, AppError>;
}

pub struct LlmCandidateScorer(pub LlmClient);

#[async_trait]
impl CandidateScorer for LlmCandidateScorer {
    async fn score(&self, job: &JobPosting, candidate: &str) -> Result<ScoreResult, AppError> {
        let prompt = build_score_prompt(job, candidate);
        let answer = self
            .0
            .complete(&prompt, SCORE_SYSTEM, SCORE_MAX_TOKENS)
            .await
            .map_err(|e| AppError::Llm(format!("Candidate scoring failed: {e}")))?;

        let result = parse_score_response(&answer);
        info!(
            job_id = %job.id,
            score = result.score,
            source = ?result.source,
            "Scored candidate"
        );
        Ok(result)
    }
}

/// Renders the job posting as prompt text, bounded to `MAX_JOB_CHARS`.
pub fn job_summary(job: &JobPosting) -> String {
    let mut summary = format!("Title: {}\nCompany: {}\n", job.title, job.company);
    if !job.requirements.is_empty() {
        summary.push_str(&format!("Requirements: {}\n", job.requirements.join("; ")));
    }
    if let Some(description) = &job.description {
        summary.push_str("Description: ");
        summary.push_str(&collapse_whitespace(description));
    }
    truncate_chars(&summary, MAX_JOB_CHARS).0.to_string()
}

pub fn build_score_prompt(job: &JobPosting, candidate: &str) -> String {
    let candidate = collapse_whitespace(candidate);
    let (candidate, _) = truncate_chars(&candidate, MAX_CANDIDATE_CHARS);
    SCORE_PROMPT_TEMPLATE
        .replace("{job}", &job_summary(job))
        .replace("{candidate}", candidate)
        .replace("{fairness}", FAIRNESS_INSTRUCTION)
}

/// Drafts a job description as free text.
pub async fn draft_job_description(
    llm: &LlmClient,
    title: &str,
    company: &str,
    notes: &str,
) -> Result<String, AppError> {
    let (notes, _) = truncate_chars(notes, MAX_JOB_CHARS);
    let prompt = DESCRIBE_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{company}", company)
        .replace("{notes}", notes);
    let text = llm
        .complete(&prompt, DESCRIBE_SYSTEM, DESCRIBE_MAX_TOKENS)
        .await
        .map_err(|e| AppError::Llm(format!("Job description drafting failed: {e}")))?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    fn job(description: Option<String>) -> JobPosting {
        JobPosting {
            id: "j1".to_string(),
            title: "Rust Engineer".to_string(),
            company: "Ferrous".to_string(),
            recruiter_id: "r1".to_string(),
            status: JobStatus::Active,
            description,
            requirements: vec!["Rust".to_string(), "Tokio".to_string()],
            created_at: None,
            applications: vec![],
        }
    }

    #[test]
    fn test_job_summary_lists_requirements() {
        let summary = job_summary(&job(Some("Build   services.\n\nShip them.".to_string())));
        assert!(summary.contains("Requirements: Rust; Tokio"));
        assert!(summary.contains("Description: Build services. Ship them."));
    }

    #[test]
    fn test_job_summary_is_bounded() {
        let summary = job_summary(&job(Some("x".repeat(10_000))));
        assert_eq!(summary.chars().count(), MAX_JOB_CHARS);
    }

    #[test]
    fn test_score_prompt_bounds_candidate() {
        let candidate = "y".repeat(10_000);
        let prompt = build_score_prompt(&job(None), &candidate);
        assert!(prompt.contains(&"y".repeat(MAX_CANDIDATE_CHARS)));
        assert!(!prompt.contains(&"y".repeat(MAX_CANDIDATE_CHARS + 1)));
        assert!(prompt.contains("\"score\""));
        assert!(!prompt.contains("{candidate}"));
    }
}
