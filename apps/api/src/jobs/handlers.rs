use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::jobs::{self, ApplyRequest, CreateJobRequest, ListQuery};
use crate::models::{ApplicationPatch, JobPatch, JobPosting};
use crate::state::AppState;

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobPosting>), AppError> {
    let job = jobs::create_posting(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    let filter = params.filter()?;
    Ok(Json(state.store.list_jobs(&filter).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobPosting>, AppError> {
    Ok(Json(jobs::get_posting(state.store.as_ref(), &id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<JobPosting>, AppError> {
    Ok(Json(
        jobs::update_posting(state.store.as_ref(), &id, patch).await?,
    ))
}

/// POST /api/v1/jobs/:id/applications
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<JobPosting>), AppError> {
    let job = jobs::apply(state.store.as_ref(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// DELETE /api/v1/jobs/:id/applications/:applicant_id
pub async fn handle_withdraw(
    State(state): State<AppState>,
    Path((id, applicant_id)): Path<(String, String)>,
) -> Result<Json<JobPosting>, AppError> {
    Ok(Json(
        jobs::withdraw(state.store.as_ref(), &id, &applicant_id).await?,
    ))
}

/// PATCH /api/v1/jobs/:id/applications/:applicant_id
pub async fn handle_update_application(
    State(state): State<AppState>,
    Path((id, applicant_id)): Path<(String, String)>,
    Json(patch): Json<ApplicationPatch>,
) -> Result<Json<JobPosting>, AppError> {
    Ok(Json(
        jobs::update_application(state.store.as_ref(), &id, &applicant_id, patch).await?,
    ))
}
