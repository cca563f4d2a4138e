//! Status Diff Engine — compares the previous pass's index with a fresh snapshot.
//!
//! The iteration scaffold lives here; what counts as a change is decided by a
//! `ReconciliationStrategy` (value diff for applicants, membership diff for
//! recruiters). Diffing is pure and never fails: a missing status decodes as
//! `applied` and a missing timestamp is read as `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Application, ApplicationStatus, JobPosting};
use crate::notifications::composer::{NotificationConfig, NotificationRecord};
use crate::notifications::index::{JobBaseline, StatusIndex};
use crate::store::JobFilter;

/// Which side of the portal a session reconciles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionView {
    Applicant,
    Recruiter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    StatusChanged,
    NewApplicant,
}

/// One detected change between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub job_id: String,
    pub job_title: String,
    pub company_name: String,
    pub previous_status: Option<ApplicationStatus>,
    pub current_status: ApplicationStatus,
    pub subject_id: String,
    pub subject_name: String,
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(
        kind: TransitionKind,
        job: &JobPosting,
        application: &Application,
        previous_status: Option<ApplicationStatus>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company_name: job.company.clone(),
            previous_status,
            current_status: application.status.clone(),
            subject_id: application.applicant_id.clone(),
            subject_name: application.applicant_name.clone(),
            timestamp,
        }
    }
}

/// The per-view rules plugged into the shared diff and compose scaffolds.
pub trait ReconciliationStrategy: Send + Sync {
    fn view(&self) -> SessionView;

    /// The signed-in user this session reconciles for.
    fn subject_id(&self) -> &str;

    /// Store filter selecting the postings this session watches.
    fn filter(&self) -> JobFilter;

    /// Whether a posting belongs to this session at all.
    fn covers_job(&self, job: &JobPosting) -> bool;

    /// Applications of a covered posting that are tracked in the index.
    fn scoped_applications<'a>(&self, job: &'a JobPosting) -> Vec<&'a Application>;

    /// Compares one scoped application with the posting's previous baseline.
    /// `previous` is `None` when the posting was not seen on the last pass.
    fn detect(
        &self,
        job: &JobPosting,
        application: &Application,
        previous: Option<&JobBaseline>,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent>;

    /// Renders a detected transition, or `None` when it is not worth showing.
    fn describe(&self, event: &TransitionEvent) -> Option<NotificationRecord>;

    /// Synthesizes a notification from current state alone.
    fn backfill(
        &self,
        job: &JobPosting,
        application: &Application,
        now: DateTime<Utc>,
        config: &NotificationConfig,
    ) -> Option<NotificationRecord>;

    fn counts_as_unread(&self, record: &NotificationRecord) -> bool;
}

/// Result of one diff pass: the events and the index to keep for the next pass.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    pub events: Vec<TransitionEvent>,
    pub index: StatusIndex,
}

/// Diffs `snapshot` against `previous`. Events come out in snapshot order.
///
/// The returned index is rebuilt from the snapshot, so postings and applicants
/// that disappeared are forgotten.
pub fn diff(
    strategy: &dyn ReconciliationStrategy,
    previous: &StatusIndex,
    snapshot: &[JobPosting],
    now: DateTime<Utc>,
) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();

    for job in snapshot.iter().filter(|job| strategy.covers_job(job)) {
        let baseline = previous.job(&job.id);
        outcome.index.observe_job(&job.id);

        for application in strategy.scoped_applications(job) {
            if let Some(event) = strategy.detect(job, application, baseline, now) {
                outcome.events.push(event);
            }
            outcome
                .index
                .record(&job.id, &application.applicant_id, application.status.clone());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::notifications::strategy::{ApplicantStatusStrategy, RecruiterApplicantStrategy};

    fn application(applicant: &str, status: ApplicationStatus) -> Application {
        Application {
            applicant_id: applicant.to_string(),
            applicant_name: applicant.to_string(),
            status,
            applied_at: None,
            updated_at: None,
            resume_url: None,
            score: None,
            score_reason: None,
        }
    }

    fn job(id: &str, recruiter: &str, applications: Vec<Application>) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: "Analyst".to_string(),
            company: "Globex".to_string(),
            recruiter_id: recruiter.to_string(),
            status: JobStatus::Active,
            description: None,
            requirements: vec![],
            created_at: None,
            applications,
        }
    }

    #[test]
    fn test_first_observation_emits_nothing() {
        let strategy = ApplicantStatusStrategy::new("a1");
        let snapshot = vec![job(
            "j1",
            "r1",
            vec![application("a1", ApplicationStatus::Hired)],
        )];
        let outcome = diff(&strategy, &StatusIndex::new(), &snapshot, Utc::now());
        assert!(outcome.events.is_empty());
        assert_eq!(
            outcome.index.status("j1", "a1"),
            Some(&ApplicationStatus::Hired)
        );
    }

    #[test]
    fn test_only_own_application_is_tracked() {
        let strategy = ApplicantStatusStrategy::new("a1");
        let snapshot = vec![job(
            "j1",
            "r1",
            vec![
                application("a1", ApplicationStatus::Applied),
                application("a2", ApplicationStatus::Applied),
            ],
        )];
        let outcome = diff(&strategy, &StatusIndex::new(), &snapshot, Utc::now());
        assert_eq!(outcome.index.len(), 1);
        assert!(outcome.index.status("j1", "a2").is_none());
    }

    #[test]
    fn test_events_follow_snapshot_order() {
        let strategy = ApplicantStatusStrategy::new("a1");
        let mut previous = StatusIndex::new();
        for id in ["j3", "j1", "j2"] {
            previous.record(id, "a1", ApplicationStatus::Applied);
        }
        let snapshot: Vec<_> = ["j3", "j1", "j2"]
            .iter()
            .map(|id| job(id, "r1", vec![application("a1", ApplicationStatus::Shortlisted)]))
            .collect();
        let outcome = diff(&strategy, &previous, &snapshot, Utc::now());
        let order: Vec<_> = outcome.events.iter().map(|e| e.job_id.as_str()).collect();
        assert_eq!(order, vec!["j3", "j1", "j2"]);
    }

    #[test]
    fn test_vanished_jobs_are_forgotten() {
        let strategy = ApplicantStatusStrategy::new("a1");
        let mut previous = StatusIndex::new();
        previous.record("gone", "a1", ApplicationStatus::Applied);
        let outcome = diff(&strategy, &previous, &[], Utc::now());
        assert!(outcome.index.is_empty());
    }

    #[test]
    fn test_membership_diff_flags_only_new_ids() {
        let strategy = RecruiterApplicantStrategy::new("r1");
        let mut previous = StatusIndex::new();
        previous.record("j1", "a1", ApplicationStatus::Applied);
        let snapshot = vec![job(
            "j1",
            "r1",
            vec![
                application("a1", ApplicationStatus::Shortlisted),
                application("a2", ApplicationStatus::Applied),
            ],
        )];
        let outcome = diff(&strategy, &previous, &snapshot, Utc::now());
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind, TransitionKind::NewApplicant);
        assert_eq!(outcome.events[0].subject_id, "a2");
        assert!(outcome.events[0].previous_status.is_none());
    }

    #[test]
    fn test_foreign_jobs_are_skipped() {
        let strategy = RecruiterApplicantStrategy::new("r1");
        let snapshot = vec![job(
            "j9",
            "someone-else",
            vec![application("a1", ApplicationStatus::Applied)],
        )];
        let outcome = diff(&strategy, &StatusIndex::new(), &snapshot, Utc::now());
        assert!(outcome.index.is_empty());
    }
}
