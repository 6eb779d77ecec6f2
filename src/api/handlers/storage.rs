use crate::api::error::AppError;
use crate::models::FileReference;
use crate::utils::auth::Claims;
use crate::AppState;
use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::Response,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(filename, NON_ALPHANUMERIC)
    )
}

#[utoipa::path(
    post,
    path = "/storage/upload",
    request_body(content = Multipart, description = "Multipart body with a `file` part"),
    responses(
        (status = 200, description = "File stored", body = FileReference),
        (status = 400, description = "Missing, empty or oversized file"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "storage"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<FileReference>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("File part has no filename".to_string()))?;
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let reference = state
            .upload_service
            .store(claims.sub, &filename, content_type.as_deref(), data.to_vec())
            .await?;
        return Ok(Json(reference));
    }

    Err(AppError::BadRequest("No file part in request".to_string()))
}

#[utoipa::path(
    get,
    path = "/storage/download/file/{id}",
    params(
        ("id" = i32, Path, description = "Uploaded file ID")
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "File or its content not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "storage"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let (file, data) = state.upload_service.fetch_owned(id, claims.sub).await?;

    tracing::info!("📎 Serving file {} to user {}", file.id, claims.sub);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &file.mime_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CONTENT_DISPOSITION, content_disposition(&file.filename))
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
