use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AdminDashboardStats, Course, CourseTracking, LearningPath, Module, ModuleProgress,
        NewCourse, NewLearningPath, NewModule, NewPlayground, Playground, ProgressStatus,
        SearchResult, UpdateCourseRequest, UpdateLearningPathRequest, UpdateModuleRequest,
        UpdatePlaygroundRequest, User, UserRole,
    },
    tree::{ModuleLayout, ModuleNode},
};

mod postgres;

pub use postgres::PostgresRepository;

/// SlugScope
///
/// The tables whose `slug` column is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Module,
    Course,
    LearningPath,
}

impl SlugScope {
    pub fn table(self) -> &'static str {
        match self {
            SlugScope::Module => "modules",
            SlugScope::Course => "courses",
            SlugScope::LearningPath => "learning_paths",
        }
    }
}

/// Repository Trait
///
/// The abstract contract for all persistence. Handlers hold an `Arc<dyn Repository>` and
/// never see SQL, which keeps them testable against in-memory mocks.
///
/// Visibility rules live in the method names: `published` variants never return drafts.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn set_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>>;

    /// Existing slugs equal to `base` or of the form `base-N`.
    async fn taken_slugs(&self, scope: SlugScope, base: &str) -> AppResult<Vec<String>>;

    // --- Modules ---
    async fn get_module(&self, id: Uuid) -> AppResult<Option<Module>>;
    async fn get_modules_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Module>>;
    async fn list_modules_by_author(&self, author_id: Uuid) -> AppResult<Vec<Module>>;
    async fn list_published_modules(&self, author_id: Option<Uuid>) -> AppResult<Vec<Module>>;
    /// The author's whole forest in the shape the layout pass needs.
    async fn get_module_nodes(&self, author_id: Uuid) -> AppResult<Vec<ModuleNode>>;
    /// Inserts `module` and writes `layout` (which may include the new row) in one
    /// transaction.
    async fn create_module(&self, module: NewModule, layout: &[ModuleLayout]) -> AppResult<Module>;
    async fn update_module(&self, id: Uuid, req: UpdateModuleRequest) -> AppResult<Option<Module>>;
    /// Deletes `ids`, writes `layout` for the survivors and recomputes tracking for every
    /// course that lost a member, in one transaction.
    async fn delete_modules(&self, ids: &[Uuid], layout: &[ModuleLayout]) -> AppResult<u64>;
    /// Writes parent, sort order and number for every given module in one transaction.
    async fn apply_module_layout(&self, layout: &[ModuleLayout]) -> AppResult<()>;

    // --- Courses ---
    async fn get_course(&self, id: Uuid) -> AppResult<Option<Course>>;
    async fn list_published_courses(&self, search: Option<String>) -> AppResult<Vec<Course>>;
    async fn list_courses_by_author(&self, author_id: Uuid) -> AppResult<Vec<Course>>;
    async fn create_course(&self, course: NewCourse) -> AppResult<Course>;
    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> AppResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> AppResult<bool>;
    /// Modules of a course in course order; `published_only` hides drafts.
    async fn get_course_modules(&self, course_id: Uuid, published_only: bool)
    -> AppResult<Vec<Module>>;
    /// Replaces the membership and refreshes every tracking row of the course.
    async fn set_course_modules(&self, course_id: Uuid, module_ids: &[Uuid]) -> AppResult<()>;

    // --- Progress & Tracking ---
    async fn list_module_progress(&self, user_id: Uuid) -> AppResult<Vec<ModuleProgress>>;
    /// Upserts the row and recomputes the user's tracking for courses containing the module.
    async fn upsert_module_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        status: ProgressStatus,
    ) -> AppResult<ModuleProgress>;
    async fn list_course_tracking(&self, user_id: Uuid) -> AppResult<Vec<CourseTracking>>;
    async fn get_course_tracking(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<Option<CourseTracking>>;
    /// `None` when the user is already enrolled.
    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<Option<CourseTracking>>;
    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool>;

    // --- Learning Paths ---
    async fn get_learning_path(&self, id: Uuid) -> AppResult<Option<LearningPath>>;
    async fn list_published_learning_paths(&self) -> AppResult<Vec<LearningPath>>;
    async fn list_learning_paths_by_author(&self, author_id: Uuid) -> AppResult<Vec<LearningPath>>;
    async fn create_learning_path(&self, path: NewLearningPath) -> AppResult<LearningPath>;
    async fn update_learning_path(
        &self,
        id: Uuid,
        req: UpdateLearningPathRequest,
    ) -> AppResult<Option<LearningPath>>;
    async fn delete_learning_path(&self, id: Uuid) -> AppResult<bool>;
    /// The subset of `ids` that exist in `courses`.
    async fn existing_course_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>>;

    // --- Playgrounds (owner-scoped) ---
    async fn list_playgrounds(&self, user_id: Uuid) -> AppResult<Vec<Playground>>;
    async fn get_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Playground>>;
    async fn create_playground(&self, playground: NewPlayground) -> AppResult<Playground>;
    async fn update_playground(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdatePlaygroundRequest,
    ) -> AppResult<Option<Playground>>;
    async fn delete_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;

    // --- Search & Stats ---
    /// Published modules and courses matching `query`, title matches first.
    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<SearchResult>>;
    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
