use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{dedupe_ids, unique_slug};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        ContentStatus, CreateLearningPathRequest, LearningPath, NewLearningPath,
        UpdateLearningPathRequest,
    },
    repository::{RepositoryState, SlugScope},
};

/// check_courses
///
/// Dedupes `course_ids` and rejects the list if any id has no course behind it.
async fn check_courses(repo: &RepositoryState, course_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let course_ids = dedupe_ids(course_ids);
    if course_ids.is_empty() {
        return Ok(course_ids);
    }
    let existing = repo.existing_course_ids(&course_ids).await?;
    if let Some(missing) = course_ids.iter().find(|id| !existing.contains(id)) {
        return Err(AppError::validation(format!("course {} does not exist", missing)));
    }
    Ok(course_ids)
}

#[utoipa::path(
    get,
    path = "/api/learning-paths",
    responses((status = 200, description = "Published learning paths", body = [LearningPath]))
)]
pub async fn list_learning_paths(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LearningPath>>> {
    Ok(Json(state.repo.list_published_learning_paths().await?))
}

#[utoipa::path(
    get,
    path = "/api/learning-paths/{id}",
    params(("id" = Uuid, Path, description = "Learning path ID")),
    responses(
        (status = 200, description = "Found", body = LearningPath),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_learning_path(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LearningPath>> {
    let path = state
        .repo
        .get_learning_path(id)
        .await?
        .filter(|p| p.status == ContentStatus::Published)
        .ok_or(AppError::NotFound("Learning path"))?;
    Ok(Json(path))
}

#[utoipa::path(
    get,
    path = "/api/learning-paths/mine",
    responses((status = 200, description = "My learning paths", body = [LearningPath]))
)]
pub async fn list_my_learning_paths(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LearningPath>>> {
    auth.require_author()?;
    Ok(Json(state.repo.list_learning_paths_by_author(auth.id).await?))
}

/// create_learning_path
///
/// [Faculty Route] Creates a curated sequence of courses. Unknown course ids are a 400.
#[utoipa::path(
    post,
    path = "/api/learning-paths",
    request_body = CreateLearningPathRequest,
    responses(
        (status = 201, description = "Created", body = LearningPath),
        (status = 400, description = "Invalid"),
        (status = 403, description = "Not Faculty")
    )
)]
pub async fn create_learning_path(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateLearningPathRequest>,
) -> AppResult<(StatusCode, Json<LearningPath>)> {
    auth.require_author()?;
    payload.validate()?;
    let course_ids = check_courses(&state.repo, &payload.course_ids).await?;

    let title = payload.title.trim().to_string();
    let slug = unique_slug(&state.repo, SlugScope::LearningPath, &title).await?;

    let path = state
        .repo
        .create_learning_path(NewLearningPath {
            author_id: auth.id,
            title,
            slug,
            description: payload.description.unwrap_or_default(),
            status: payload.status.unwrap_or_default(),
            course_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(path)))
}

#[utoipa::path(
    put,
    path = "/api/learning-paths/{id}",
    params(("id" = Uuid, Path, description = "Learning path ID")),
    request_body = UpdateLearningPathRequest,
    responses(
        (status = 200, description = "Updated", body = LearningPath),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_learning_path(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateLearningPathRequest>,
) -> AppResult<Json<LearningPath>> {
    auth.require_author()?;
    payload.validate()?;

    let existing = state
        .repo
        .get_learning_path(id)
        .await?
        .ok_or(AppError::NotFound("Learning path"))?;
    auth.require_owner(existing.author_id)?;

    if let Some(course_ids) = payload.course_ids.take() {
        payload.course_ids = Some(check_courses(&state.repo, &course_ids).await?);
    }

    let path = state
        .repo
        .update_learning_path(id, payload)
        .await?
        .ok_or(AppError::NotFound("Learning path"))?;
    Ok(Json(path))
}

#[utoipa::path(
    delete,
    path = "/api/learning-paths/{id}",
    params(("id" = Uuid, Path, description = "Learning path ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_learning_path(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_author()?;
    let existing = state
        .repo
        .get_learning_path(id)
        .await?
        .ok_or(AppError::NotFound("Learning path"))?;
    auth.require_owner(existing.author_id)?;

    if state.repo.delete_learning_path(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Learning path"))
    }
}
