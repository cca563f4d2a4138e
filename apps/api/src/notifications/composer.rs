//! Notification Composer — turns transitions and recent activity into the
//! capped, de-duplicated, newest-first list a session shows.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ApplicationStatus, JobPosting};
use crate::notifications::diff::{ReconciliationStrategy, TransitionEvent};

pub const DEFAULT_NOTIFICATION_CAP: usize = 10;
pub const DEFAULT_APPLICANT_WINDOW_HOURS: i64 = 48;
pub const DEFAULT_RECRUITER_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTag {
    Success,
    Info,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StatusUpdate,
    NewApplicant,
}

/// Where a record came from: a transition seen live, or a scan of current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOrigin {
    Transition,
    RecentActivity,
}

/// A view-layer notification. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// `{job}:{subject}:{status}` for status updates, `{job}:{subject}` for new applicants.
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub tag: NotificationTag,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub job_id: String,
    pub subject_id: String,
    pub origin: NotificationOrigin,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// How far back an applicant's status change is backfilled.
    pub applicant_window: Duration,
    /// How far back a new application is backfilled for its recruiter.
    pub recruiter_window: Duration,
    pub cap: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            applicant_window: Duration::hours(DEFAULT_APPLICANT_WINDOW_HOURS),
            recruiter_window: Duration::hours(DEFAULT_RECRUITER_WINDOW_HOURS),
            cap: DEFAULT_NOTIFICATION_CAP,
        }
    }
}

/// Output of one composition pass.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    /// Records produced by transitions detected on this pass.
    pub fresh: Vec<NotificationRecord>,
    pub alert: bool,
}

/// Tag and title for an applicant-facing status, or `None` for statuses not shown.
pub fn classify(status: &ApplicationStatus) -> Option<(NotificationTag, &'static str)> {
    match status {
        ApplicationStatus::Shortlisted => Some((NotificationTag::Success, "🎉 Shortlisted!")),
        ApplicationStatus::InterviewScheduled => {
            Some((NotificationTag::Info, "📅 Interview Scheduled"))
        }
        ApplicationStatus::Hired => Some((NotificationTag::Success, "🎊 You're Hired!")),
        ApplicationStatus::Rejected => Some((NotificationTag::Neutral, "Application Update")),
        ApplicationStatus::Applied | ApplicationStatus::Unknown(_) => None,
    }
}

fn status_message(status: &ApplicationStatus, job_title: &str, company: &str) -> String {
    let role = if company.is_empty() {
        job_title.to_string()
    } else {
        format!("{job_title} at {company}")
    };
    match status {
        ApplicationStatus::Shortlisted => format!("You've been shortlisted for {role}."),
        ApplicationStatus::InterviewScheduled => {
            format!("An interview has been scheduled for {role}.")
        }
        ApplicationStatus::Hired => format!("Congratulations! You've been hired for {role}."),
        ApplicationStatus::Rejected => {
            format!("Your application for {role} was not selected to move forward.")
        }
        other => format!("Your application for {role} is now {other}."),
    }
}

/// Builds an applicant-facing status notification.
pub fn status_record(
    job_id: &str,
    job_title: &str,
    company: &str,
    subject_id: &str,
    status: &ApplicationStatus,
    timestamp: DateTime<Utc>,
    origin: NotificationOrigin,
) -> Option<NotificationRecord> {
    let (tag, title) = classify(status)?;
    Some(NotificationRecord {
        id: format!("{job_id}:{subject_id}:{status}"),
        kind: NotificationKind::StatusUpdate,
        title: title.to_string(),
        message: status_message(status, job_title, company),
        tag,
        status: status.to_string(),
        timestamp,
        job_id: job_id.to_string(),
        subject_id: subject_id.to_string(),
        origin,
    })
}

/// Builds a recruiter-facing "new applicant" notification.
pub fn applicant_record(
    job_id: &str,
    job_title: &str,
    subject_id: &str,
    subject_name: &str,
    timestamp: DateTime<Utc>,
    origin: NotificationOrigin,
) -> NotificationRecord {
    let who = if subject_name.trim().is_empty() {
        "A new candidate"
    } else {
        subject_name
    };
    NotificationRecord {
        id: format!("{job_id}:{subject_id}"),
        kind: NotificationKind::NewApplicant,
        title: "👤 New Applicant".to_string(),
        message: format!("{who} applied for {job_title}."),
        tag: NotificationTag::Info,
        status: ApplicationStatus::Applied.to_string(),
        timestamp,
        job_id: job_id.to_string(),
        subject_id: subject_id.to_string(),
        origin,
    }
}

/// Whether `at` falls inside `window` before `now`. Future timestamps count as recent.
pub fn within_window(at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(at) <= window
}

/// Composes this pass's notification list.
///
/// Merge order is: records for this pass's transitions, records retained from
/// earlier passes, then recent-activity backfill. The first record per id
/// wins, so a transition and a backfill of the same change collapse into the
/// transition's record. The alert fires when a prior baseline existed and this
/// pass detected any transition, notified or not.
pub fn compose(
    strategy: &dyn ReconciliationStrategy,
    events: &[TransitionEvent],
    snapshot: &[JobPosting],
    retained: &[NotificationRecord],
    has_prior_baseline: bool,
    now: DateTime<Utc>,
    config: &NotificationConfig,
) -> Composition {
    let fresh: Vec<NotificationRecord> = events
        .iter()
        .filter_map(|event| strategy.describe(event))
        .collect();

    let backfill = snapshot
        .iter()
        .filter(|job| strategy.covers_job(job))
        .flat_map(|job| {
            strategy
                .scoped_applications(job)
                .into_iter()
                .filter_map(move |application| strategy.backfill(job, application, now, config))
        });

    let mut seen = HashSet::new();
    let mut notifications: Vec<NotificationRecord> = fresh
        .iter()
        .cloned()
        .chain(retained.iter().cloned())
        .chain(backfill)
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    // Stable sort keeps merge order among equal timestamps.
    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    notifications.truncate(config.cap);

    let unread_count = notifications
        .iter()
        .filter(|record| strategy.counts_as_unread(record))
        .count();
    let alert = has_prior_baseline && !events.is_empty();

    Composition {
        notifications,
        unread_count,
        fresh,
        alert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(
            classify(&ApplicationStatus::Shortlisted).map(|c| c.0),
            Some(NotificationTag::Success)
        );
        assert_eq!(
            classify(&ApplicationStatus::InterviewScheduled).map(|c| c.0),
            Some(NotificationTag::Info)
        );
        assert_eq!(
            classify(&ApplicationStatus::Hired).map(|c| c.0),
            Some(NotificationTag::Success)
        );
        assert_eq!(
            classify(&ApplicationStatus::Rejected).map(|c| c.0),
            Some(NotificationTag::Neutral)
        );
        assert!(classify(&ApplicationStatus::Applied).is_none());
        assert!(classify(&ApplicationStatus::Unknown("on_hold".to_string())).is_none());
    }

    #[test]
    fn test_status_record_id_includes_status() {
        let record = status_record(
            "j1",
            "Engineer",
            "Acme",
            "a1",
            &ApplicationStatus::InterviewScheduled,
            Utc::now(),
            NotificationOrigin::Transition,
        )
        .unwrap();
        assert_eq!(record.id, "j1:a1:interview_scheduled");
        assert_eq!(record.title, "📅 Interview Scheduled");
        assert!(record.message.contains("Engineer at Acme"));
    }

    #[test]
    fn test_applicant_record_without_name() {
        let record = applicant_record(
            "j1",
            "Engineer",
            "a1",
            "  ",
            Utc::now(),
            NotificationOrigin::RecentActivity,
        );
        assert_eq!(record.id, "j1:a1");
        assert_eq!(record.message, "A new candidate applied for Engineer.");
        assert_eq!(record.kind, NotificationKind::NewApplicant);
    }

    #[test]
    fn test_within_window_bounds() {
        let now = Utc::now();
        let window = Duration::hours(48);
        assert!(within_window(now - Duration::hours(47), now, window));
        assert!(within_window(now - Duration::hours(48), now, window));
        assert!(!within_window(now - Duration::hours(49), now, window));
        assert!(within_window(now + Duration::minutes(5), now, window));
    }
}
