use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::resume::{fetch_and_extract, ExtractedText};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

/// POST /api/v1/resumes/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractedText>, AppError> {
    let extracted = fetch_and_extract(&state.http, req.url.trim()).await?;
    Ok(Json(extracted))
}
