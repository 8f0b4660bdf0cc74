use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Faculty Router Module
///
/// Authoring endpoints. The router only guarantees an authenticated caller; each
/// handler calls `AuthUser::require_author` and, for mutations, `require_owner`.
pub fn faculty_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Modules ---
        .route("/modules/mine", get(handlers::modules::list_my_modules))
        .route("/modules", post(handlers::modules::create_module))
        // PUT /api/modules/reorder
        // Must stay a static segment so it is not captured by `{id}`.
        .route("/modules/reorder", put(handlers::modules::reorder_modules))
        // PUT/DELETE /api/modules/{id}
        // DELETE removes the whole subtree and renumbers the survivors.
        .route(
            "/modules/{id}",
            put(handlers::modules::update_module).delete(handlers::modules::delete_module),
        )
        .route("/modules/{id}/move", put(handlers::modules::move_module))
        // --- Courses ---
        .route("/courses/mine", get(handlers::courses::list_my_courses))
        .route("/courses", post(handlers::courses::create_course))
        .route(
            "/courses/{id}",
            put(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
        // PUT /api/courses/{id}/modules
        // Ordered, de-duplicated replacement of the course's modules.
        .route(
            "/courses/{id}/modules",
            put(handlers::courses::set_course_modules),
        )
        // --- Learning paths ---
        .route(
            "/learning-paths/mine",
            get(handlers::learning_paths::list_my_learning_paths),
        )
        .route(
            "/learning-paths",
            post(handlers::learning_paths::create_learning_path),
        )
        .route(
            "/learning-paths/{id}",
            put(handlers::learning_paths::update_learning_path)
                .delete(handlers::learning_paths::delete_learning_path),
        )
        // POST /api/upload/presigned
        // Direct-to-bucket media upload for a module the caller owns.
        .route(
            "/upload/presigned",
            post(handlers::uploads::get_presigned_url),
        )
}
