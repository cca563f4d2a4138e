use std::collections::HashMap;

use crate::models::ApplicationStatus;

/// Last observed status of every in-scope applicant of one posting.
pub type JobBaseline = HashMap<String, ApplicationStatus>;

/// Per-session memory of what the previous pass saw, keyed by job then subject.
///
/// Owned by exactly one subscription: created empty when it starts, replaced
/// after each successful pass and dropped with the subscription. A posting
/// present with an empty baseline means "seen, no applicants in scope", which
/// is different from "never seen".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusIndex {
    jobs: HashMap<String, JobBaseline>,
}

impl StatusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, job_id: &str) -> Option<&JobBaseline> {
        self.jobs.get(job_id)
    }

    pub fn status(&self, job_id: &str, subject_id: &str) -> Option<&ApplicationStatus> {
        self.jobs.get(job_id).and_then(|b| b.get(subject_id))
    }

    /// Marks a posting as observed without recording any subject.
    pub fn observe_job(&mut self, job_id: &str) {
        self.jobs.entry(job_id.to_string()).or_default();
    }

    pub fn record(&mut self, job_id: &str, subject_id: &str, status: ApplicationStatus) {
        self.jobs
            .entry(job_id.to_string())
            .or_default()
            .insert(subject_id.to_string(), status);
    }

    /// Number of (job, subject) pairs tracked.
    pub fn len(&self) -> usize {
        self.jobs.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_job_has_empty_baseline() {
        let mut index = StatusIndex::new();
        index.observe_job("j1");
        assert!(index.job("j1").unwrap().is_empty());
        assert!(index.job("j2").is_none());
        assert_eq!(index.len(), 0);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_record_overwrites() {
        let mut index = StatusIndex::new();
        index.record("j1", "a1", ApplicationStatus::Applied);
        index.record("j1", "a1", ApplicationStatus::Hired);
        assert_eq!(index.status("j1", "a1"), Some(&ApplicationStatus::Hired));
        assert_eq!(index.len(), 1);
    }
}
