//! The two reconciliation strategies.
//!
//! - `ApplicantStatusStrategy`: value diff. Watches the signed-in applicant's own
//!   entries and reports status changes.
//! - `RecruiterApplicantStrategy`: membership diff. Watches every entry on the
//!   recruiter's postings and reports applicant ids that were not there before.

use chrono::{DateTime, Utc};

use crate::models::{Application, ApplicationStatus, JobPosting};
use crate::notifications::composer::{
    applicant_record, status_record, within_window, NotificationConfig, NotificationKind,
    NotificationOrigin, NotificationRecord, NotificationTag,
};
use crate::notifications::diff::{
    ReconciliationStrategy, SessionView, TransitionEvent, TransitionKind,
};
use crate::notifications::index::JobBaseline;
use crate::store::JobFilter;

/// Builds the strategy for a session view.
pub fn strategy_for(view: SessionView, subject_id: String) -> Box<dyn ReconciliationStrategy> {
    match view {
        SessionView::Applicant => Box::new(ApplicantStatusStrategy::new(subject_id)),
        SessionView::Recruiter => Box::new(RecruiterApplicantStrategy::new(subject_id)),
    }
}

pub struct ApplicantStatusStrategy {
    applicant_id: String,
}

impl ApplicantStatusStrategy {
    pub fn new(applicant_id: impl Into<String>) -> Self {
        Self {
            applicant_id: applicant_id.into(),
        }
    }
}

impl ReconciliationStrategy for ApplicantStatusStrategy {
    fn view(&self) -> SessionView {
        SessionView::Applicant
    }

    fn subject_id(&self) -> &str {
        &self.applicant_id
    }

    fn filter(&self) -> JobFilter {
        JobFilter::AppliedBy(self.applicant_id.clone())
    }

    fn covers_job(&self, job: &JobPosting) -> bool {
        job.has_applicant(&self.applicant_id)
    }

    fn scoped_applications<'a>(&self, job: &'a JobPosting) -> Vec<&'a Application> {
        job.applications
            .iter()
            .filter(|a| a.applicant_id == self.applicant_id)
            .collect()
    }

    fn detect(
        &self,
        job: &JobPosting,
        application: &Application,
        previous: Option<&JobBaseline>,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        // First observation primes the index silently.
        let previous = previous?.get(&application.applicant_id)?;
        if *previous == application.status {
            return None;
        }
        Some(TransitionEvent::new(
            TransitionKind::StatusChanged,
            job,
            application,
            Some(previous.clone()),
            application.updated_at.unwrap_or(now),
        ))
    }

    fn describe(&self, event: &TransitionEvent) -> Option<NotificationRecord> {
        status_record(
            &event.job_id,
            &event.job_title,
            &event.company_name,
            &event.subject_id,
            &event.current_status,
            event.timestamp,
            NotificationOrigin::Transition,
        )
    }

    fn backfill(
        &self,
        job: &JobPosting,
        application: &Application,
        now: DateTime<Utc>,
        config: &NotificationConfig,
    ) -> Option<NotificationRecord> {
        if application.status == ApplicationStatus::Applied {
            return None;
        }
        let updated_at = application.updated_at?;
        if !within_window(updated_at, now, config.applicant_window) {
            return None;
        }
        status_record(
            &job.id,
            &job.title,
            &job.company,
            &application.applicant_id,
            &application.status,
            updated_at,
            NotificationOrigin::RecentActivity,
        )
    }

    fn counts_as_unread(&self, record: &NotificationRecord) -> bool {
        matches!(record.tag, NotificationTag::Success | NotificationTag::Info)
    }
}

pub struct RecruiterApplicantStrategy {
    recruiter_id: String,
}

impl RecruiterApplicantStrategy {
    pub fn new(recruiter_id: impl Into<String>) -> Self {
        Self {
            recruiter_id: recruiter_id.into(),
        }
    }
}

impl ReconciliationStrategy for RecruiterApplicantStrategy {
    fn view(&self) -> SessionView {
        SessionView::Recruiter
    }

    fn subject_id(&self) -> &str {
        &self.recruiter_id
    }

    fn filter(&self) -> JobFilter {
        JobFilter::OwnedBy(self.recruiter_id.clone())
    }

    fn covers_job(&self, job: &JobPosting) -> bool {
        job.recruiter_id == self.recruiter_id
    }

    fn scoped_applications<'a>(&self, job: &'a JobPosting) -> Vec<&'a Application> {
        job.applications.iter().collect()
    }

    fn detect(
        &self,
        job: &JobPosting,
        application: &Application,
        previous: Option<&JobBaseline>,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        // A posting seen for the first time primes its applicant list.
        let previous = previous?;
        if previous.contains_key(&application.applicant_id) {
            return None;
        }
        Some(TransitionEvent::new(
            TransitionKind::NewApplicant,
            job,
            application,
            None,
            application.applied_at.unwrap_or(now),
        ))
    }

    fn describe(&self, event: &TransitionEvent) -> Option<NotificationRecord> {
        Some(applicant_record(
            &event.job_id,
            &event.job_title,
            &event.subject_id,
            &event.subject_name,
            event.timestamp,
            NotificationOrigin::Transition,
        ))
    }

    fn backfill(
        &self,
        job: &JobPosting,
        application: &Application,
        now: DateTime<Utc>,
        config: &NotificationConfig,
    ) -> Option<NotificationRecord> {
        let applied_at = application.applied_at?;
        if !within_window(applied_at, now, config.recruiter_window) {
            return None;
        }
        Some(applicant_record(
            &job.id,
            &job.title,
            &application.applicant_id,
            &application.applicant_name,
            applied_at,
            NotificationOrigin::RecentActivity,
        ))
    }

    fn counts_as_unread(&self, record: &NotificationRecord) -> bool {
        record.kind == NotificationKind::NewApplicant
    }
}
