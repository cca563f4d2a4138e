use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{StoredObject, UploadKind};

#[derive(Deserialize)]
pub struct UploadQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub key: String,
}

/// POST /api/v1/uploads/:kind
///
/// Takes the first multipart field carrying a file.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(kind): Path<UploadKind>,
    Query(params): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredObject>), AppError> {
    if params.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let stored = state
            .blobs
            .upload(kind, params.user_id.trim(), &content_type, data)
            .await?;
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(AppError::Validation(
        "Multipart body has no file field".to_string(),
    ))
}

/// DELETE /api/v1/uploads
pub async fn handle_delete(
    State(state): State<AppState>,
    Query(params): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    state.blobs.delete(&params.key).await?;
    Ok(StatusCode::NO_CONTENT)
}
