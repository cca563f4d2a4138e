use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{ChangeFeed, JobFilter, JobStore, StoreError};
use crate::models::{Application, ApplicationPatch, JobPatch, JobPosting};

const CHANGE_BUFFER: usize = 256;

/// Process-local job store. Postings are kept ordered by id so listings are
/// deterministic; every mutation is announced on a broadcast channel.
pub struct InMemoryJobStore {
    jobs: RwLock<BTreeMap<String, JobPosting>>,
    changes: broadcast::Sender<String>,
    #[cfg(test)]
    fail_reads: AtomicBool,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            jobs: RwLock::new(BTreeMap::new()),
            changes,
            #[cfg(test)]
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `list_jobs` calls fail until reset.
    #[cfg(test)]
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn announce(&self, job_id: &str) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.changes.send(job_id.to_string());
    }

    async fn mutate<F>(&self, job_id: &str, f: F) -> Result<JobPosting, StoreError>
    where
        F: FnOnce(&mut JobPosting) -> Result<(), StoreError> + Send,
    {
        let updated = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(job_id)
                .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;
            f(job)?;
            job.clone()
        };
        debug!("Job {job_id} updated in memory");
        self.announce(job_id);
        Ok(updated)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        #[cfg(test)]
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect())
    }

    async fn create_job(&self, job: JobPosting) -> Result<JobPosting, StoreError> {
        {
            let mut jobs = self.jobs.write().await;
            if jobs.contains_key(&job.id) {
                return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
            }
            jobs.insert(job.id.clone(), job.clone());
        }
        self.announce(&job.id);
        Ok(job)
    }

    async fn update_job(&self, job_id: &str, patch: JobPatch) -> Result<JobPosting, StoreError> {
        self.mutate(job_id, |job| {
            job.apply_patch(patch);
            Ok(())
        })
        .await
    }

    async fn add_application(
        &self,
        job_id: &str,
        application: Application,
    ) -> Result<JobPosting, StoreError> {
        self.mutate(job_id, |job| job.add_application(application))
            .await
    }

    async fn remove_application(
        &self,
        job_id: &str,
        applicant_id: &str,
    ) -> Result<JobPosting, StoreError> {
        self.mutate(job_id, |job| {
            job.remove_application(applicant_id);
            Ok(())
        })
        .await
    }

    async fn update_application(
        &self,
        job_id: &str,
        applicant_id: &str,
        patch: ApplicationPatch,
    ) -> Result<JobPosting, StoreError> {
        let now = Utc::now();
        self.mutate(job_id, |job| job.patch_application(applicant_id, patch, now))
            .await
    }

    async fn watch(&self) -> Result<Box<dyn ChangeFeed>, StoreError> {
        Ok(Box::new(BroadcastChangeFeed {
            rx: self.changes.subscribe(),
        }))
    }
}

struct BroadcastChangeFeed {
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl ChangeFeed for BroadcastChangeFeed {
    async fn next_change(&mut self) -> Result<Option<String>, StoreError> {
        match self.rx.recv().await {
            Ok(job_id) => Ok(Some(job_id)),
            // Missed notices collapse into one: the subscriber re-reads anyway.
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Change feed lagged by {skipped} notices");
                Ok(Some(String::new()))
            }
            Err(broadcast::error::RecvError::Closed) => Ok(None),
        }
    }
}
