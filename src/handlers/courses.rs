use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{dedupe_ids, unique_slug};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        ContentStatus, Course, CourseDetail, CreateCourseRequest, NewCourse,
        SetCourseModulesRequest, UpdateCourseRequest,
    },
    repository::{RepositoryState, SlugScope},
};

/// CourseFilter
///
/// Accepted query parameters for the public course listing (GET /api/courses).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CourseFilter {
    /// Optional case-insensitive match against title and description.
    pub search: Option<String>,
}

async fn load_owned(repo: &RepositoryState, auth: &AuthUser, id: Uuid) -> AppResult<Course> {
    let course = repo.get_course(id).await?.ok_or(AppError::NotFound("Course"))?;
    auth.require_owner(course.author_id)?;
    Ok(course)
}

/// list_courses
///
/// [Public Route] Published courses, alphabetical, optionally filtered by `search`.
#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseFilter),
    responses((status = 200, description = "Published courses", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(state.repo.list_published_courses(filter.search).await?))
}

/// get_course
///
/// [Public Route] A published course with its published modules in course order.
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = CourseDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CourseDetail>> {
    let course = state
        .repo
        .get_course(id)
        .await?
        .filter(|c| c.status == ContentStatus::Published)
        .ok_or(AppError::NotFound("Course"))?;
    let modules = state.repo.get_course_modules(id, true).await?;
    Ok(Json(CourseDetail { course, modules }))
}

/// list_my_courses
///
/// [Faculty Route] Courses authored by the caller, drafts included.
#[utoipa::path(
    get,
    path = "/api/courses/mine",
    responses((status = 200, description = "My Courses", body = [Course]))
)]
pub async fn list_my_courses(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Course>>> {
    auth.require_author()?;
    Ok(Json(state.repo.list_courses_by_author(auth.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Invalid"),
        (status = 403, description = "Not Faculty")
    )
)]
pub async fn create_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<Course>)> {
    auth.require_author()?;
    payload.validate()?;

    let title = payload.title.trim().to_string();
    let slug = unique_slug(&state.repo, SlugScope::Course, &title).await?;

    let course = state
        .repo
        .create_course(NewCourse {
            author_id: auth.id,
            title,
            slug,
            description: payload.description.unwrap_or_default(),
            status: payload.status.unwrap_or_default(),
        })
        .await?;

    tracing::info!("course {} created by {}", course.id, auth.id);
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> AppResult<Json<Course>> {
    auth.require_author()?;
    payload.validate()?;
    load_owned(&state.repo, &auth, id).await?;

    let course = state
        .repo
        .update_course(id, payload)
        .await?
        .ok_or(AppError::NotFound("Course"))?;
    Ok(Json(course))
}

/// delete_course
///
/// [Faculty Route] Removes the course. Membership rows and enrolments cascade; the
/// modules themselves are untouched.
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_course(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_author()?;
    load_owned(&state.repo, &auth, id).await?;

    if state.repo.delete_course(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Course"))
    }
}

/// set_course_modules
///
/// [Faculty Route] Replaces the course's module list with `module_ids`, in order.
///
/// * Repeated ids keep their first position.
/// * Every module must exist (404 otherwise).
/// * A module must be the caller's own or already published; admins may use any.
///
/// Enrolled students' completion is recomputed against the new list.
#[utoipa::path(
    put,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = SetCourseModulesRequest,
    responses(
        (status = 200, description = "Updated", body = CourseDetail),
        (status = 400, description = "Foreign draft module"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Course or Module Not Found")
    )
)]
pub async fn set_course_modules(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetCourseModulesRequest>,
) -> AppResult<Json<CourseDetail>> {
    auth.require_author()?;
    let course = load_owned(&state.repo, &auth, id).await?;

    let module_ids = dedupe_ids(&payload.module_ids);
    let modules = state.repo.get_modules_by_ids(&module_ids).await?;
    if modules.len() != module_ids.len() {
        return Err(AppError::NotFound("Module"));
    }
    if let Some(foreign) = modules.iter().find(|m| {
        !auth.is_admin() && m.author_id != auth.id && m.status != ContentStatus::Published
    }) {
        return Err(AppError::validation(format!(
            "module {} is an unpublished draft of another author",
            foreign.id
        )));
    }

    state.repo.set_course_modules(id, &module_ids).await?;
    tracing::info!("course {} now has {} modules", id, module_ids.len());

    let modules = state.repo.get_course_modules(id, false).await?;
    Ok(Json(CourseDetail { course, modules }))
}
