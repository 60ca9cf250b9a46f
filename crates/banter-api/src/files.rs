use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use banter_types::api::{Claims, FileUrlResponse, UploadResponse, UploadTarget};

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;

/// 10 MB cap for image attachments.
const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// POST /files — phase one of the upload protocol: hand out a target the
/// client PUTs the binary to. Nothing is recorded until the upload lands.
pub async fn request_upload_target(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    current_user(&state, &claims).await?;

    let file_id = Uuid::new_v4();
    Ok(Json(UploadTarget {
        file_id,
        upload_url: format!("/files/{}", file_id),
    }))
}

/// PUT /files/{id} — phase two: raw bytes (image/*), saved to the upload
/// directory and recorded. The resulting id is attached to a message send.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("empty upload".into()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation("file exceeds the 10 MB limit".into()));
    }

    let me = current_user(&state, &claims).await?;
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory: {}", e);
        ApiError::Internal(e.into())
    })?;

    let file_path = state.upload_dir.join(file_id.to_string());
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        ApiError::Internal(e.into())
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        ApiError::Internal(e.into())
    })?;

    let db = state.clone();
    let fid = file_id.to_string();
    blocking(move || db.db.insert_file(&fid, &me.id, size)).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id,
            size: size as u64,
        }),
    ))
}

/// GET /files/{id}/url — resolve a storage reference to a display URL.
/// A miss is a null body, never an error; the UI treats null as
/// "unavailable".
pub async fn resolve_file_url(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if maybe_current_user(&state, &claims).await?.is_none() {
        return Ok(Json(FileUrlResponse { url: None }));
    }

    let db = state.clone();
    let fid = file_id.to_string();
    let row = blocking(move || db.db.get_file(&fid)).await?;

    Ok(Json(FileUrlResponse {
        url: row.map(|_| format!("/files/{}", file_id)),
    }))
}

/// GET /files/{id} — serve the stored bytes. The uuid path parameter also
/// rules out path traversal.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let fid = file_id.to_string();
    let row = blocking(move || db.db.get_file(&fid)).await?;

    if row.is_none() {
        return Err(ApiError::NotFound("file not found"));
    }

    let file_path = state.upload_dir.join(file_id.to_string());
    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        error!("Failed to read file {}: {}", file_path.display(), e);
        ApiError::NotFound("file not found")
    })?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
