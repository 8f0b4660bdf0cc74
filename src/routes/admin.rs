use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/api/admin`. Handlers reject non-admins with 403 via
/// `AuthUser::require_admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Dashboard counts: users, faculty, modules, courses, enrolments.
        .route("/stats", get(handlers::admin::get_admin_stats))
        .route("/users", get(handlers::admin::list_users))
        // PUT /api/admin/users/{id}/role
        // Self-demotion is refused.
        .route("/users/{id}/role", put(handlers::admin::update_user_role))
}
