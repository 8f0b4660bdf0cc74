use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without credentials. Every handler here filters on
/// `status = 'published'`; drafts answer 404.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/courses?search=...
        .route("/courses", get(handlers::courses::list_courses))
        // GET /api/courses/{id}
        // The course plus its published modules in course order.
        .route("/courses/{id}", get(handlers::courses::get_course))
        // GET /api/modules/tree?author_id=...
        // Table of contents for one author. Static segment wins over `{id}`.
        .route("/modules/tree", get(handlers::modules::get_module_tree))
        // GET /api/modules/{id}
        .route("/modules/{id}", get(handlers::modules::get_module))
        .route(
            "/learning-paths",
            get(handlers::learning_paths::list_learning_paths),
        )
        .route(
            "/learning-paths/{id}",
            get(handlers::learning_paths::get_learning_path),
        )
        // GET /api/search?q=...&limit=...
        .route("/search", get(handlers::search::search))
}
