use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::get_posting;
use crate::models::{ApplicationPatch, JobPosting};
use crate::resume::fetch_and_extract;
use crate::scoring::{draft_job_description, ScoreSource};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ScoreRequest {
    /// Candidate summary to score instead of the stored resume.
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Serialize)]
pub struct ScoreResponse {
    pub score: u8,
    pub reason: String,
    pub source: ScoreSource,
    pub job: JobPosting,
}

#[derive(Deserialize)]
pub struct DescribeRequest {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize)]
pub struct DescribeResponse {
    pub description: String,
}

/// POST /api/v1/jobs/:id/applications/:applicant_id/score
pub async fn handle_score(
    State(state): State<AppState>,
    Path((id, applicant_id)): Path<(String, String)>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let job = get_posting(state.store.as_ref(), &id).await?;
    let application = job.application(&applicant_id).ok_or_else(|| {
        AppError::NotFound(format!("Application {applicant_id} on job {id} not found"))
    })?;

    let candidate = match req.summary.filter(|s| !s.trim().is_empty()) {
        Some(summary) => summary,
        None => {
            let url = application.resume_url.as_deref().ok_or_else(|| {
                AppError::Validation(
                    "Application has no resume; provide a candidate summary".to_string(),
                )
            })?;
            fetch_and_extract(&state.http, url).await?.text
        }
    };
    let candidate = if application.applicant_name.is_empty() {
        candidate
    } else {
        format!("Name: {}\n{candidate}", application.applicant_name)
    };

    let result = state.scorer.score(&job, &candidate).await?;

    let patch = ApplicationPatch {
        score: Some(result.score),
        score_reason: Some(result.reason.clone()),
        ..Default::default()
    };
    let job = state
        .store
        .update_application(&id, &applicant_id, patch)
        .await?;

    Ok(Json(ScoreResponse {
        score: result.score,
        reason: result.reason,
        source: result.source,
        job,
    }))
}

/// POST /api/v1/jobs/describe
pub async fn handle_describe(
    State(state): State<AppState>,
    Json(req): Json<DescribeRequest>,
) -> Result<Json<DescribeResponse>, AppError> {
    if req.title.trim().is_empty() || req.company.trim().is_empty() {
        return Err(AppError::Validation(
            "title and company are required".to_string(),
        ));
    }
    let description =
        draft_job_description(&state.llm, req.title.trim(), req.company.trim(), &req.notes)
            .await?;
    Ok(Json(DescribeResponse { description }))
}
