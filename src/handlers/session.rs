use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::UserProfile,
};

/// get_session
///
/// [Authenticated Route] The profile behind the presented credentials.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not Authenticated")
    )
)]
pub async fn get_session(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(UserProfile::from(user)))
}
