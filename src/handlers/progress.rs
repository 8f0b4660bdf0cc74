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
    models::{ContentStatus, CourseTracking, ModuleProgress, UpdateModuleProgressRequest},
};

#[utoipa::path(
    get,
    path = "/api/progress/modules",
    responses((status = 200, description = "My module progress", body = [ModuleProgress]))
)]
pub async fn list_module_progress(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ModuleProgress>>> {
    Ok(Json(state.repo.list_module_progress(auth.id).await?))
}

/// update_module_progress
///
/// [Authenticated Route] Records the caller's status on a module. The module must be
/// published, unless the caller may edit it. Completion of every course the caller is
/// enrolled in that contains the module is recomputed in the same transaction.
#[utoipa::path(
    put,
    path = "/api/progress/modules/{module_id}",
    params(("module_id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleProgressRequest,
    responses(
        (status = 200, description = "Saved", body = ModuleProgress),
        (status = 404, description = "Module Not Found")
    )
)]
pub async fn update_module_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    Json(payload): Json<UpdateModuleProgressRequest>,
) -> AppResult<Json<ModuleProgress>> {
    state
        .repo
        .get_module(module_id)
        .await?
        .filter(|m| m.status == ContentStatus::Published || auth.require_owner(m.author_id).is_ok())
        .ok_or(AppError::NotFound("Module"))?;

    let progress = state
        .repo
        .upsert_module_progress(auth.id, module_id, payload.status)
        .await?;
    Ok(Json(progress))
}

#[utoipa::path(
    get,
    path = "/api/progress/courses",
    responses((status = 200, description = "My enrolments", body = [CourseTracking]))
)]
pub async fn list_course_tracking(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CourseTracking>>> {
    Ok(Json(state.repo.list_course_tracking(auth.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/progress/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolment", body = CourseTracking),
        (status = 404, description = "Not Enrolled")
    )
)]
pub async fn get_course_tracking(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseTracking>> {
    let tracking = state
        .repo
        .get_course_tracking(auth.id, course_id)
        .await?
        .ok_or(AppError::NotFound("Enrollment"))?;
    Ok(Json(tracking))
}

/// enroll
///
/// [Authenticated Route] Enrols the caller in a published course. Modules completed
/// beforehand count towards the initial percentage.
#[utoipa::path(
    post,
    path = "/api/progress/courses/{course_id}/enroll",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 201, description = "Enrolled", body = CourseTracking),
        (status = 404, description = "Course Not Found"),
        (status = 409, description = "Already Enrolled")
    )
)]
pub async fn enroll(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<CourseTracking>)> {
    state
        .repo
        .get_course(course_id)
        .await?
        .filter(|c| c.status == ContentStatus::Published)
        .ok_or(AppError::NotFound("Course"))?;

    match state.repo.enroll(auth.id, course_id).await? {
        Some(tracking) => Ok((StatusCode::CREATED, Json(tracking))),
        None => Err(AppError::Conflict(
            "Already enrolled in this course".to_string(),
        )),
    }
}

#[utoipa::path(
    delete,
    path = "/api/progress/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Unenrolled"),
        (status = 404, description = "Not Enrolled")
    )
)]
pub async fn unenroll(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.repo.unenroll(auth.id, course_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Enrollment"))
    }
}
