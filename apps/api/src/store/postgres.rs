use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{ChangeFeed, JobFilter, JobStore, StoreError};
use crate::models::{Application, ApplicationPatch, JobPatch, JobPosting};

/// `NOTIFY` channel carrying the id of every mutated posting.
pub const CHANGE_CHANNEL: &str = "job_posting_changes";

/// PostgreSQL-backed job store. Each posting is one JSONB document; mutations
/// are read-modify-write inside a transaction holding the row lock, and the
/// change notice is sent from the same transaction so it is only delivered
/// on commit.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn mutate<F>(&self, job_id: &str, f: F) -> Result<JobPosting, StoreError>
    where
        F: FnOnce(&mut JobPosting) -> Result<(), StoreError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let current: Option<Json<JobPosting>> =
            sqlx::query_scalar("SELECT data FROM job_postings WHERE id = $1 FOR UPDATE")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Json(mut job) = current.ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;

        f(&mut job)?;

        sqlx::query("UPDATE job_postings SET data = $2, updated_at = now() WHERE id = $1")
            .bind(job_id)
            .bind(Json(&job))
            .execute(&mut *tx)
            .await?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Job {job_id} updated");
        Ok(job)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError> {
        let row: Option<Json<JobPosting>> =
            sqlx::query_scalar("SELECT data FROM job_postings WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(job)| job))
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        let rows: Vec<Json<JobPosting>> = match filter {
            JobFilter::AppliedBy(applicant_id) => {
                sqlx::query_scalar(
                    r#"
                    SELECT data FROM job_postings
                    WHERE data -> 'applications' @> jsonb_build_array(
                        jsonb_build_object('applicant_id', $1::text))
                    ORDER BY created_at, id
                    "#,
                )
                .bind(applicant_id)
                .fetch_all(&self.pool)
                .await?
            }
            JobFilter::OwnedBy(recruiter_id) => {
                sqlx::query_scalar(
                    "SELECT data FROM job_postings WHERE recruiter_id = $1 ORDER BY created_at, id",
                )
                .bind(recruiter_id)
                .fetch_all(&self.pool)
                .await?
            }
            JobFilter::All => {
                sqlx::query_scalar("SELECT data FROM job_postings ORDER BY created_at, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(|Json(job)| job).collect())
    }

    async fn create_job(&self, job: JobPosting) -> Result<JobPosting, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO job_postings (id, recruiter_id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&job.id)
        .bind(&job.recruiter_id)
        .bind(Json(&job))
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
        }

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(&job.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Created job {} for recruiter {}", job.id, job.recruiter_id);
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
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        debug!("Listening on {CHANGE_CHANNEL}");
        Ok(Box::new(PgChangeFeed { listener }))
    }
}

/// `LISTEN`-based change feed. `PgListener` reconnects on its own after a
/// dropped connection; notices sent while disconnected are lost, which the
/// subscriber tolerates because it re-reads full state on the next notice.
struct PgChangeFeed {
    listener: PgListener,
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn next_change(&mut self) -> Result<Option<String>, StoreError> {
        let notification = self.listener.recv().await?;
        Ok(Some(notification.payload().to_string()))
    }
}
