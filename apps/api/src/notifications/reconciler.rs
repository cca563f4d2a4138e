use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::JobPosting;
use crate::notifications::composer::{compose, NotificationConfig, NotificationRecord};
use crate::notifications::diff::{diff, ReconciliationStrategy, TransitionEvent};
use crate::notifications::index::StatusIndex;

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub events: Vec<TransitionEvent>,
    pub notifications: Vec<NotificationRecord>,
    /// Records produced by this pass's transitions; the alert payload.
    pub fresh: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub alert: bool,
}

/// The reconciliation context of one subscription: its strategy, the status
/// index from the previous pass and the notifications currently held.
///
/// Created when a subscription starts and dropped with it; never shared.
pub struct Reconciler {
    strategy: Box<dyn ReconciliationStrategy>,
    config: NotificationConfig,
    index: StatusIndex,
    held: Vec<NotificationRecord>,
    has_baseline: bool,
}

impl Reconciler {
    pub fn new(strategy: Box<dyn ReconciliationStrategy>, config: NotificationConfig) -> Self {
        Self {
            strategy,
            config,
            index: StatusIndex::new(),
            held: Vec::new(),
            has_baseline: false,
        }
    }

    pub fn strategy(&self) -> &dyn ReconciliationStrategy {
        self.strategy.as_ref()
    }

    pub fn index(&self) -> &StatusIndex {
        &self.index
    }

    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.held
    }

    pub fn has_baseline(&self) -> bool {
        self.has_baseline
    }

    /// Runs diff and compose for one snapshot and commits the new state.
    pub fn reconcile(&mut self, snapshot: &[JobPosting], now: DateTime<Utc>) -> PassOutcome {
        let outcome = diff(self.strategy.as_ref(), &self.index, snapshot, now);
        let composition = compose(
            self.strategy.as_ref(),
            &outcome.events,
            snapshot,
            &self.held,
            self.has_baseline,
            now,
            &self.config,
        );

        debug!(
            subject = self.strategy.subject_id(),
            events = outcome.events.len(),
            notifications = composition.notifications.len(),
            tracked = outcome.index.len(),
            "Reconciled snapshot of {} jobs",
            snapshot.len()
        );

        self.index = outcome.index;
        self.held = composition.notifications.clone();
        self.has_baseline = true;

        PassOutcome {
            events: outcome.events,
            notifications: composition.notifications,
            fresh: composition.fresh,
            unread_count: composition.unread_count,
            alert: composition.alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Application, ApplicationStatus, JobStatus};
    use crate::notifications::composer::{NotificationKind, NotificationOrigin, NotificationTag};
    use crate::notifications::strategy::{ApplicantStatusStrategy, RecruiterApplicantStrategy};
    use chrono::Duration;

    fn application(applicant: &str, status: ApplicationStatus) -> Application {
        Application {
            applicant_id: applicant.to_string(),
            applicant_name: format!("Candidate {applicant}"),
            status,
            applied_at: None,
            updated_at: None,
            resume_url: None,
            score: None,
            score_reason: None,
        }
    }

    fn job(id: &str, applications: Vec<Application>) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: format!("Role {id}"),
            company: "Acme".to_string(),
            recruiter_id: "r1".to_string(),
            status: JobStatus::Active,
            description: None,
            requirements: vec![],
            created_at: None,
            applications,
        }
    }

    fn applicant_reconciler() -> Reconciler {
        Reconciler::new(
            Box::new(ApplicantStatusStrategy::new("a1")),
            NotificationConfig::default(),
        )
    }

    fn recruiter_reconciler() -> Reconciler {
        Reconciler::new(
            Box::new(RecruiterApplicantStrategy::new("r1")),
            NotificationConfig::default(),
        )
    }

    #[test]
    fn test_priming_then_shortlisted_yields_one_success() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();

        let first = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        assert!(first.events.is_empty());
        assert!(first.notifications.is_empty());
        assert_eq!(first.unread_count, 0);

        let second = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Shortlisted)])],
            now,
        );
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.notifications.len(), 1);
        assert_eq!(second.notifications[0].tag, NotificationTag::Success);
        assert_eq!(second.unread_count, 1);
        assert!(second.alert);
    }

    #[test]
    fn test_interview_scenario() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        assert_eq!(
            rec.index().status("j1", "a1"),
            Some(&ApplicationStatus::Applied)
        );

        let pass = rec.reconcile(
            &[job(
                "j1",
                vec![application("a1", ApplicationStatus::InterviewScheduled)],
            )],
            now,
        );
        assert_eq!(pass.events.len(), 1);
        let event = &pass.events[0];
        assert_eq!(event.job_id, "j1");
        assert_eq!(event.subject_id, "a1");
        assert_eq!(event.previous_status, Some(ApplicationStatus::Applied));
        assert_eq!(event.current_status, ApplicationStatus::InterviewScheduled);

        assert_eq!(pass.notifications.len(), 1);
        assert_eq!(pass.notifications[0].tag, NotificationTag::Info);
        assert_eq!(pass.notifications[0].title, "📅 Interview Scheduled");
        assert_eq!(pass.unread_count, 1);
        assert!(pass.alert);
    }

    #[test]
    fn test_two_jobs_change_in_one_snapshot() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[
                job("j1", vec![application("a1", ApplicationStatus::Applied)]),
                job("j2", vec![application("a1", ApplicationStatus::Applied)]),
            ],
            now,
        );

        let mut rejected = application("a1", ApplicationStatus::Rejected);
        rejected.updated_at = Some(now - Duration::minutes(10));
        let mut hired = application("a1", ApplicationStatus::Hired);
        hired.updated_at = Some(now - Duration::minutes(1));

        let pass = rec.reconcile(&[job("j1", vec![rejected]), job("j2", vec![hired])], now);
        assert_eq!(pass.events.len(), 2);
        assert_eq!(pass.events[0].job_id, "j1");
        assert_eq!(pass.events[1].job_id, "j2");

        assert_eq!(pass.notifications.len(), 2);
        assert_eq!(pass.notifications[0].job_id, "j2");
        assert_eq!(pass.notifications[0].tag, NotificationTag::Success);
        assert_eq!(pass.notifications[1].job_id, "j1");
        assert_eq!(pass.notifications[1].tag, NotificationTag::Neutral);
        assert_eq!(pass.unread_count, 1);
    }

    #[test]
    fn test_identical_redelivery_is_idempotent() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        let snapshot = [job("j1", vec![application("a1", ApplicationStatus::Hired)])];
        let changed = rec.reconcile(&snapshot, now);
        assert_eq!(changed.events.len(), 1);

        let again = rec.reconcile(&snapshot, now);
        assert!(again.events.is_empty());
        assert!(!again.alert);
        assert_eq!(again.notifications, changed.notifications);
        assert_eq!(again.unread_count, changed.unread_count);
    }

    #[test]
    fn test_transition_and_backfill_collapse() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        let mut shortlisted = application("a1", ApplicationStatus::Shortlisted);
        shortlisted.updated_at = Some(now - Duration::hours(1));

        let pass = rec.reconcile(&[job("j1", vec![shortlisted])], now);
        assert_eq!(pass.notifications.len(), 1);
        assert_eq!(pass.notifications[0].id, "j1:a1:shortlisted");
        assert_eq!(pass.notifications[0].origin, NotificationOrigin::Transition);
    }

    #[test]
    fn test_first_pass_never_alerts() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        let jobs: Vec<_> = (0..5)
            .map(|i| {
                let mut app = application("a1", ApplicationStatus::Hired);
                app.updated_at = Some(now - Duration::hours(i));
                job(&format!("j{i}"), vec![app])
            })
            .collect();

        let pass = rec.reconcile(&jobs, now);
        assert!(pass.events.is_empty());
        assert!(!pass.alert);
        // Recent-activity backfill still shows, without alerting.
        assert_eq!(pass.notifications.len(), 5);
        assert!(pass
            .notifications
            .iter()
            .all(|n| n.origin == NotificationOrigin::RecentActivity));
    }

    #[test]
    fn test_stale_status_is_not_backfilled() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        let mut app = application("a1", ApplicationStatus::Shortlisted);
        app.updated_at = Some(now - Duration::hours(72));
        let pass = rec.reconcile(&[job("j1", vec![app])], now);
        assert!(pass.notifications.is_empty());
    }

    #[test]
    fn test_unknown_status_updates_index_only() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        let on_hold = ApplicationStatus::Unknown("on_hold".to_string());
        let pass = rec.reconcile(&[job("j1", vec![application("a1", on_hold.clone())])], now);

        assert_eq!(pass.events.len(), 1);
        assert!(pass.notifications.is_empty());
        assert!(pass.alert);
        assert!(pass.fresh.is_empty());
        assert_eq!(rec.index().status("j1", "a1"), Some(&on_hold));
    }

    #[test]
    fn test_return_to_applied_is_a_transition() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Rejected)])],
            now,
        );
        let pass = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        assert_eq!(pass.events.len(), 1);
        assert_eq!(
            pass.events[0].previous_status,
            Some(ApplicationStatus::Rejected)
        );
        assert_eq!(pass.events[0].current_status, ApplicationStatus::Applied);
    }

    #[test]
    fn test_return_to_applied_raises_alert_without_notification() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Rejected)])],
            now,
        );
        let pass = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        assert_eq!(pass.events.len(), 1);
        assert!(pass.alert);
        assert!(pass.fresh.is_empty());
    }

    #[test]
    fn test_notification_list_is_capped() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        let statuses = [
            ApplicationStatus::Applied,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::InterviewScheduled,
            ApplicationStatus::Hired,
        ];
        let jobs_with = |status: &ApplicationStatus, step: i64| -> Vec<JobPosting> {
            (0..6)
                .map(|i| {
                    let mut app = application("a1", status.clone());
                    app.updated_at = Some(now - Duration::minutes(i * 10 + step));
                    job(&format!("j{i}"), vec![app])
                })
                .collect()
        };

        for (step, status) in statuses.iter().enumerate() {
            let pass = rec.reconcile(&jobs_with(status, step as i64), now);
            assert!(pass.notifications.len() <= 10);
        }
        assert_eq!(rec.notifications().len(), 10);
        // Newest first.
        let stamps: Vec<_> = rec.notifications().iter().map(|n| n.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let mut rec = applicant_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        let pass = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Hired)])],
            now,
        );
        assert_eq!(pass.events[0].timestamp, now);
    }

    #[test]
    fn test_recruiter_sees_new_applicant_after_baseline() {
        let mut rec = recruiter_reconciler();
        let now = Utc::now();

        let first = rec.reconcile(&[job("j1", vec![])], now);
        assert!(first.events.is_empty());

        let mut newcomer = application("a2", ApplicationStatus::Applied);
        newcomer.applied_at = Some(now - Duration::minutes(2));
        let pass = rec.reconcile(&[job("j1", vec![newcomer])], now);

        assert_eq!(pass.events.len(), 1);
        assert_eq!(pass.notifications.len(), 1);
        let record = &pass.notifications[0];
        assert_eq!(record.id, "j1:a2");
        assert_eq!(record.kind, NotificationKind::NewApplicant);
        assert_eq!(record.message, "Candidate a2 applied for Role j1.");
        assert_eq!(pass.unread_count, 1);
        assert!(pass.alert);
    }

    #[test]
    fn test_recruiter_ignores_status_changes() {
        let mut rec = recruiter_reconciler();
        let now = Utc::now();
        rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Applied)])],
            now,
        );
        let pass = rec.reconcile(
            &[job("j1", vec![application("a1", ApplicationStatus::Hired)])],
            now,
        );
        assert!(pass.events.is_empty());
        assert!(!pass.alert);
    }

    #[test]
    fn test_recruiter_primes_newly_posted_job() {
        let mut rec = recruiter_reconciler();
        let now = Utc::now();
        rec.reconcile(&[job("j1", vec![])], now);
        let pass = rec.reconcile(
            &[
                job("j1", vec![]),
                job("j2", vec![application("a1", ApplicationStatus::Applied)]),
            ],
            now,
        );
        assert!(pass.events.is_empty());
        assert!(rec.index().job("j2").is_some());
    }

    #[test]
    fn test_recruiter_backfills_recent_applications() {
        let mut rec = recruiter_reconciler();
        let now = Utc::now();
        let mut fresh = application("a1", ApplicationStatus::Applied);
        fresh.applied_at = Some(now - Duration::hours(3));
        let mut old = application("a2", ApplicationStatus::Applied);
        old.applied_at = Some(now - Duration::hours(30));

        let pass = rec.reconcile(&[job("j1", vec![fresh, old])], now);
        assert_eq!(pass.notifications.len(), 1);
        assert_eq!(pass.notifications[0].subject_id, "a1");
        assert_eq!(pass.unread_count, 1);
        assert!(!pass.alert);
    }
}
