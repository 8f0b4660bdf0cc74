use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{AdminDashboardStats, UpdateUserRoleRequest, User, UserRole},
};

/// get_admin_stats
///
/// [Admin Route] Headline counts for the dashboard.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not Admin")
    )
)]
pub async fn get_admin_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    auth.require_admin()?;
    Ok(Json(state.repo.get_stats().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not Admin")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<User>>> {
    auth.require_admin()?;
    Ok(Json(state.repo.list_users().await?))
}

/// update_user_role
///
/// [Admin Route] Promotes or demotes a user. An admin cannot demote themself, so the
/// system can never be left without the admin who made the change.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Self demotion"),
        (status = 403, description = "Not Admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> AppResult<Json<User>> {
    auth.require_admin()?;
    if id == auth.id && payload.role != UserRole::Admin {
        return Err(AppError::validation("admins cannot demote themselves"));
    }

    let user = state
        .repo
        .set_user_role(id, payload.role)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    tracing::info!("user {} is now {:?} (changed by {})", id, user.role, auth.id);
    Ok(Json(user))
}
