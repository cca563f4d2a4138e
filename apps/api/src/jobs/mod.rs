//! Job postings and applications — request validation on top of `JobStore`.
//!
//! Handlers stay thin; everything here takes `&dyn JobStore` so it can be
//! exercised against the in-memory backend.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Application, ApplicationPatch, ApplicationStatus, JobPatch, JobPosting, JobStatus,
};
use crate::store::{JobFilter, JobStore};

pub mod handlers;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    pub recruiter_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub applicant_id: String,
    #[serde(default)]
    pub applicant_name: String,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub recruiter_id: Option<String>,
    pub applicant_id: Option<String>,
}

fn require(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl ListQuery {
    pub fn filter(&self) -> Result<JobFilter, AppError> {
        match (self.recruiter_id.as_deref(), self.applicant_id.as_deref()) {
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Filter by recruiter_id or applicant_id, not both".to_string(),
            )),
            (Some(recruiter), None) => Ok(JobFilter::OwnedBy(require("recruiter_id", recruiter)?)),
            (None, Some(applicant)) => {
                Ok(JobFilter::AppliedBy(require("applicant_id", applicant)?))
            }
            (None, None) => Ok(JobFilter::All),
        }
    }
}

/// Statuses outside the known set may exist in stored documents but are never written here.
fn validate_patch(patch: &ApplicationPatch) -> Result<(), AppError> {
    if let Some(ApplicationStatus::Unknown(raw)) = &patch.status {
        return Err(AppError::Validation(format!(
            "Unknown application status '{raw}'"
        )));
    }
    if let Some(score) = patch.score {
        if score > 100 {
            return Err(AppError::Validation(format!(
                "Score must be between 0 and 100, got {score}"
            )));
        }
    }
    Ok(())
}

pub async fn create_posting(
    store: &dyn JobStore,
    req: CreateJobRequest,
) -> Result<JobPosting, AppError> {
    let job = JobPosting {
        id: Uuid::new_v4().to_string(),
        title: require("title", &req.title)?,
        company: require("company", &req.company)?,
        recruiter_id: require("recruiter_id", &req.recruiter_id)?,
        status: JobStatus::Active,
        description: req.description.filter(|d| !d.trim().is_empty()),
        requirements: req
            .requirements
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        created_at: Some(Utc::now()),
        applications: Vec::new(),
    };
    let job = store.create_job(job).await?;
    info!(job_id = %job.id, recruiter = %job.recruiter_id, "Job posting created");
    Ok(job)
}

pub async fn get_posting(store: &dyn JobStore, job_id: &str) -> Result<JobPosting, AppError> {
    store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

pub async fn update_posting(
    store: &dyn JobStore,
    job_id: &str,
    patch: JobPatch,
) -> Result<JobPosting, AppError> {
    if let Some(title) = &patch.title {
        require("title", title)?;
    }
    Ok(store.update_job(job_id, patch).await?)
}

pub async fn apply(
    store: &dyn JobStore,
    job_id: &str,
    req: ApplyRequest,
) -> Result<JobPosting, AppError> {
    let job = get_posting(store, job_id).await?;
    if job.status == JobStatus::Closed {
        return Err(AppError::Validation(format!(
            "Job {job_id} is closed to new applications"
        )));
    }

    let now = Utc::now();
    let application = Application {
        applicant_id: require("applicant_id", &req.applicant_id)?,
        applicant_name: req.applicant_name.trim().to_string(),
        status: ApplicationStatus::Applied,
        applied_at: Some(now),
        updated_at: Some(now),
        resume_url: req.resume_url.filter(|u| !u.trim().is_empty()),
        score: None,
        score_reason: None,
    };
    let applicant_id = application.applicant_id.clone();
    let job = store.add_application(job_id, application).await?;
    info!(job_id, applicant = %applicant_id, "Application submitted");
    Ok(job)
}

pub async fn withdraw(
    store: &dyn JobStore,
    job_id: &str,
    applicant_id: &str,
) -> Result<JobPosting, AppError> {
    let job = store.remove_application(job_id, applicant_id).await?;
    info!(job_id, applicant = applicant_id, "Application withdrawn");
    Ok(job)
}

pub async fn update_application(
    store: &dyn JobStore,
    job_id: &str,
    applicant_id: &str,
    patch: ApplicationPatch,
) -> Result<JobPosting, AppError> {
    validate_patch(&patch)?;
    let status = patch.status.clone();
    let job = store.update_application(job_id, applicant_id, patch).await?;
    if let Some(status) = status {
        info!(job_id, applicant = applicant_id, %status, "Application status updated");
    }
    Ok(job)
}
