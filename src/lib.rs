use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod retry;
pub mod storage;

// Pure domain logic, free of I/O.
pub mod progress;
pub mod slug;
pub mod tree;

// Routers segregated by access level.
pub mod routes;
use auth::AuthUser;
use routes::{admin, faculty, learner, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// Embedded schema migrations, run by `main` at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::session::get_session,
        handlers::modules::get_module, handlers::modules::get_module_tree,
        handlers::modules::list_my_modules, handlers::modules::create_module,
        handlers::modules::update_module, handlers::modules::delete_module,
        handlers::modules::move_module, handlers::modules::reorder_modules,
        handlers::courses::list_courses, handlers::courses::get_course,
        handlers::courses::list_my_courses, handlers::courses::create_course,
        handlers::courses::update_course, handlers::courses::delete_course,
        handlers::courses::set_course_modules,
        handlers::progress::list_module_progress, handlers::progress::update_module_progress,
        handlers::progress::list_course_tracking, handlers::progress::get_course_tracking,
        handlers::progress::enroll, handlers::progress::unenroll,
        handlers::learning_paths::list_learning_paths, handlers::learning_paths::get_learning_path,
        handlers::learning_paths::list_my_learning_paths,
        handlers::learning_paths::create_learning_path,
        handlers::learning_paths::update_learning_path,
        handlers::learning_paths::delete_learning_path,
        handlers::playgrounds::list_playgrounds, handlers::playgrounds::get_playground,
        handlers::playgrounds::create_playground, handlers::playgrounds::update_playground,
        handlers::playgrounds::delete_playground,
        handlers::search::search,
        handlers::uploads::get_presigned_url,
        handlers::admin::get_admin_stats, handlers::admin::list_users,
        handlers::admin::update_user_role
    ),
    components(
        schemas(
            models::UserRole, models::ContentStatus, models::ProgressStatus,
            models::TrackingStatus, models::User, models::UserProfile,
            models::Module, models::ModuleTree, models::ModuleDetail,
            models::Course, models::CourseDetail, models::ModuleProgress,
            models::CourseTracking, models::LearningPath, models::Playground,
            models::SearchResult, models::AdminDashboardStats,
            models::CreateModuleRequest, models::UpdateModuleRequest,
            models::MoveModuleRequest, models::ReorderModulesRequest,
            models::CreateCourseRequest, models::UpdateCourseRequest,
            models::SetCourseModulesRequest, models::UpdateModuleProgressRequest,
            models::CreateLearningPathRequest, models::UpdateLearningPathRequest,
            models::CreatePlaygroundRequest, models::UpdatePlaygroundRequest,
            models::UpdateUserRoleRequest, models::PresignedUrlRequest,
            models::PresignedUrlResponse,
        )
    ),
    tags(
        (name = "etextbook", description = "E-Textbook Content Management API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container for services and configuration, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Object storage for module media.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor before the handler. A failed extraction rejects the
/// request with 401 and the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, scoped authentication, observability layers and state.
///
/// Layout:
/// * `/health`, `/swagger-ui`, `/api-docs/openapi.json`
/// * `/api/...` public, learner and faculty routes
/// * `/api/admin/...` admin routes
pub fn create_router(state: AppState) -> Router {
    // 1. CORS
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    // 2. API assembly. Public routes carry no middleware; everything else is layered
    // with `require_auth` before being merged so the layer stays scoped to its routes.
    let api = public::public_routes()
        .merge(learner::learner_routes().route_layer(require_auth.clone()))
        .merge(faculty::faculty_routes().route_layer(require_auth.clone()))
        .nest("/admin", admin::admin_routes().route_layer(require_auth));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state);

    // 3. Observability and correlation layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Every request gets a UUID in `x-request-id`.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request, carrying that id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS outermost
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span from method, URI and the `x-request-id` header, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
