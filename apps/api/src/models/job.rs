use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Lifecycle of a job posting as set by its recruiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Active,
    Closed,
}

/// Status of one application inside a job posting.
///
/// Values outside the known set are kept verbatim in `Unknown` so that a newer
/// writer never breaks decoding. A missing or `null` status decodes as `Applied`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Shortlisted,
    InterviewScheduled,
    Rejected,
    Hired,
    Unknown(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Unknown(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "applied" => ApplicationStatus::Applied,
            "shortlisted" => ApplicationStatus::Shortlisted,
            "interview_scheduled" => ApplicationStatus::InterviewScheduled,
            "rejected" => ApplicationStatus::Rejected,
            "hired" => ApplicationStatus::Hired,
            other => ApplicationStatus::Unknown(other.to_string()),
        }
    }
}

impl From<Option<String>> for ApplicationStatus {
    fn from(raw: Option<String>) -> Self {
        raw.map(|s| ApplicationStatus::parse(&s)).unwrap_or_default()
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applicant's entry, embedded in the job posting document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub applicant_id: String,
    #[serde(default)]
    pub applicant_name: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_reason: Option<String>,
}

/// A job posting document. Owned by `recruiter_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub recruiter_id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// Partial update of job-level fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
}

/// Partial update of one embedded application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub score: Option<u8>,
    pub score_reason: Option<String>,
}

impl JobPosting {
    pub fn application(&self, applicant_id: &str) -> Option<&Application> {
        self.applications
            .iter()
            .find(|a| a.applicant_id == applicant_id)
    }

    pub fn has_applicant(&self, applicant_id: &str) -> bool {
        self.application(applicant_id).is_some()
    }

    pub fn apply_patch(&mut self, patch: JobPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// Array-union on the application list: one entry per applicant.
    pub fn add_application(&mut self, application: Application) -> Result<(), StoreError> {
        if self.has_applicant(&application.applicant_id) {
            return Err(StoreError::Conflict(format!(
                "applicant {} already applied to job {}",
                application.applicant_id, self.id
            )));
        }
        self.applications.push(application);
        Ok(())
    }

    /// Array-remove on the application list. Returns whether anything was removed.
    pub fn remove_application(&mut self, applicant_id: &str) -> bool {
        let before = self.applications.len();
        self.applications.retain(|a| a.applicant_id != applicant_id);
        self.applications.len() != before
    }

    /// Applies `patch` to the applicant's entry, stamping `updated_at` on a status write.
    pub fn patch_application(
        &mut self,
        applicant_id: &str,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let job_id = self.id.clone();
        let application = self
            .applications
            .iter_mut()
            .find(|a| a.applicant_id == applicant_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!("application {applicant_id} on job {job_id}"))
            })?;

        if let Some(status) = patch.status {
            application.status = status;
            application.updated_at = Some(now);
        }
        if let Some(score) = patch.score {
            application.score = Some(score.min(100));
        }
        if let Some(reason) = patch.score_reason {
            application.score_reason = Some(reason);
        }
        Ok(())
    }
}
