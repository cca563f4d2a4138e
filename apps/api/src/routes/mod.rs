pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::notifications::handlers as notifications;
use crate::resume::handlers as resume;
use crate::scoring::handlers as scoring;
use crate::state::AppState;
use crate::storage::{handlers as storage, UploadKind};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job postings and applications
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/describe", post(scoring::handle_describe))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job).patch(jobs::handle_update_job),
        )
        .route("/api/v1/jobs/:id/applications", post(jobs::handle_apply))
        .route(
            "/api/v1/jobs/:id/applications/:applicant_id",
            delete(jobs::handle_withdraw).patch(jobs::handle_update_application),
        )
        .route(
            "/api/v1/jobs/:id/applications/:applicant_id/score",
            post(scoring::handle_score),
        )
        // Notifications
        .route(
            "/api/v1/notifications/stream",
            get(notifications::handle_stream),
        )
        // Documents
        .route("/api/v1/resumes/extract", post(resume::handle_extract))
        .route(
            "/api/v1/uploads/:kind",
            post(storage::handle_upload).layer(DefaultBodyLimit::max(UploadKind::body_limit())),
        )
        .route("/api/v1/uploads", delete(storage::handle_delete))
        .with_state(state)
}
