use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{CreatePlaygroundRequest, NewPlayground, Playground, UpdatePlaygroundRequest},
};

// Playgrounds are private scratch space. Every query is scoped to the caller, so a
// foreign id looks exactly like a missing one (404).

#[utoipa::path(
    get,
    path = "/api/playgrounds",
    responses((status = 200, description = "My playgrounds", body = [Playground]))
)]
pub async fn list_playgrounds(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Playground>>> {
    Ok(Json(state.repo.list_playgrounds(auth.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/playgrounds/{id}",
    params(("id" = Uuid, Path, description = "Playground ID")),
    responses(
        (status = 200, description = "Found", body = Playground),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_playground(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Playground>> {
    let playground = state
        .repo
        .get_playground(id, auth.id)
        .await?
        .ok_or(AppError::NotFound("Playground"))?;
    Ok(Json(playground))
}

/// create_playground
///
/// [Authenticated Route] Any role may create playgrounds. An attached `module_id` must exist.
#[utoipa::path(
    post,
    path = "/api/playgrounds",
    request_body = CreatePlaygroundRequest,
    responses(
        (status = 201, description = "Created", body = Playground),
        (status = 400, description = "Invalid"),
        (status = 404, description = "Module Not Found")
    )
)]
pub async fn create_playground(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePlaygroundRequest>,
) -> AppResult<(StatusCode, Json<Playground>)> {
    payload.validate()?;

    if let Some(module_id) = payload.module_id {
        state
            .repo
            .get_module(module_id)
            .await?
            .ok_or(AppError::NotFound("Module"))?;
    }

    let playground = state
        .repo
        .create_playground(NewPlayground {
            user_id: auth.id,
            module_id: payload.module_id,
            title: payload.title.trim().to_string(),
            language: payload.language.trim().to_string(),
            source: payload.source,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(playground)))
}

#[utoipa::path(
    put,
    path = "/api/playgrounds/{id}",
    params(("id" = Uuid, Path, description = "Playground ID")),
    request_body = UpdatePlaygroundRequest,
    responses(
        (status = 200, description = "Updated", body = Playground),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_playground(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlaygroundRequest>,
) -> AppResult<Json<Playground>> {
    payload.validate()?;
    let playground = state
        .repo
        .update_playground(id, auth.id, payload)
        .await?
        .ok_or(AppError::NotFound("Playground"))?;
    Ok(Json(playground))
}

#[utoipa::path(
    delete,
    path = "/api/playgrounds/{id}",
    params(("id" = Uuid, Path, description = "Playground ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_playground(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.repo.delete_playground(id, auth.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Playground"))
    }
}
