use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Learner Router Module
///
/// Routes for any authenticated user, whatever the role. Every handler scopes its data
/// to the `AuthUser` resolved by the authentication layer.
pub fn learner_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/session
        .route("/auth/session", get(handlers::session::get_session))
        // --- Module progress ---
        .route(
            "/progress/modules",
            get(handlers::progress::list_module_progress),
        )
        // PUT /api/progress/modules/{module_id}
        // Also recomputes completion of the caller's enrolled courses.
        .route(
            "/progress/modules/{module_id}",
            put(handlers::progress::update_module_progress),
        )
        // --- Course enrolment ---
        .route(
            "/progress/courses",
            get(handlers::progress::list_course_tracking),
        )
        .route(
            "/progress/courses/{course_id}",
            get(handlers::progress::get_course_tracking).delete(handlers::progress::unenroll),
        )
        // POST /api/progress/courses/{course_id}/enroll
        // 201 on success, 409 when already enrolled.
        .route(
            "/progress/courses/{course_id}/enroll",
            post(handlers::progress::enroll),
        )
        // --- Playgrounds (owner-only) ---
        .route(
            "/playgrounds",
            get(handlers::playgrounds::list_playgrounds)
                .post(handlers::playgrounds::create_playground),
        )
        .route(
            "/playgrounds/{id}",
            get(handlers::playgrounds::get_playground)
                .put(handlers::playgrounds::update_playground)
                .delete(handlers::playgrounds::delete_playground),
        )
}
