//! Job store — typed document store for job postings.
//!
//! Every backend offers point reads, filtered listing, atomic partial updates,
//! array-union / array-remove on the embedded application list and a change
//! feed that announces the id of every mutated posting.
//!
//! `AppState` holds an `Arc<dyn JobStore>`; the notification engine consumes
//! the same trait through `notifications::feed`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Application, ApplicationPatch, JobPatch, JobPosting};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Change feed closed")]
    FeedClosed,
}

/// Which postings a subscriber cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFilter {
    /// Postings carrying an application from this applicant.
    AppliedBy(String),
    /// Postings owned by this recruiter.
    OwnedBy(String),
    All,
}

impl JobFilter {
    pub fn matches(&self, job: &JobPosting) -> bool {
        match self {
            JobFilter::AppliedBy(applicant_id) => job.has_applicant(applicant_id),
            JobFilter::OwnedBy(recruiter_id) => &job.recruiter_id == recruiter_id,
            JobFilter::All => true,
        }
    }
}

/// A stream of change notices. Each notice carries the id of the posting
/// that changed; subscribers re-read state rather than trusting the notice.
#[async_trait]
pub trait ChangeFeed: Send {
    /// Waits for the next change. `Ok(None)` means the feed ended cleanly.
    async fn next_change(&mut self) -> Result<Option<String>, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError>;

    async fn create_job(&self, job: JobPosting) -> Result<JobPosting, StoreError>;

    async fn update_job(&self, job_id: &str, patch: JobPatch) -> Result<JobPosting, StoreError>;

    async fn add_application(
        &self,
        job_id: &str,
        application: Application,
    ) -> Result<JobPosting, StoreError>;

    async fn remove_application(
        &self,
        job_id: &str,
        applicant_id: &str,
    ) -> Result<JobPosting, StoreError>;

    async fn update_application(
        &self,
        job_id: &str,
        applicant_id: &str,
        patch: ApplicationPatch,
    ) -> Result<JobPosting, StoreError>;

    /// Opens a change feed. Changes made after this call are guaranteed to be announced.
    async fn watch(&self) -> Result<Box<dyn ChangeFeed>, StoreError>;
}
