use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{PresignedUrlRequest, PresignedUrlResponse},
    storage::{is_allowed_media_type, media_key},
};

/// get_presigned_url
///
/// [Faculty Route] Mints a short-lived PUT URL for media embedded in a module.
///
/// *Security*: only the module's owner (or an admin) may upload, the content type is
/// checked against the media allow-list and the signed URL is bound to it, and the
/// object key is server-generated under `modules/{module_id}/`.
#[utoipa::path(
    post,
    path = "/api/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Unsupported media type"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Module Not Found")
    )
)]
pub async fn get_presigned_url(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> AppResult<Json<PresignedUrlResponse>> {
    auth.require_author()?;
    if !is_allowed_media_type(&payload.file_type) {
        return Err(AppError::validation(format!(
            "unsupported media type {}",
            payload.file_type
        )));
    }

    let module = state
        .repo
        .get_module(payload.module_id)
        .await?
        .ok_or(AppError::NotFound("Module"))?;
    auth.require_owner(module.author_id)?;

    let object_key = media_key(module.id, &payload.filename);
    let upload_url = state
        .storage
        .presigned_upload_url(&object_key, payload.file_type.trim())
        .await
        .map_err(AppError::Storage)?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}
