use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_CONTENT_LEN: usize = 500_000;
pub const MAX_SOURCE_LEN: usize = 100_000;
pub const MAX_LANGUAGE_LEN: usize = 32;

// --- Enumerations (mirrored by Postgres enum types) ---

/// UserRole
///
/// The RBAC field stored in `users.role`. Faculty author content, admins moderate everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[ts(export)]
pub enum UserRole {
    #[default]
    Student,
    Faculty,
    Admin,
}

/// ContentStatus
///
/// Visibility of authored content. Only `Published` rows are served on public routes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
#[ts(export)]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "progress_status", rename_all = "snake_case")]
#[ts(export)]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tracking_status", rename_all = "snake_case")]
#[ts(export)]
pub enum TrackingStatus {
    #[default]
    Enrolled,
    InProgress,
    Completed,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record in `users`. Credentials live with the external identity
/// provider; this row only carries what authorization needs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Module
///
/// A single authored learning unit. Modules form a per-author forest through
/// `parent_module_id`; `sort_order` and `module_number` are maintained by the
/// tree renumbering pass and never written directly by clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Module {
    pub id: Uuid,
    pub author_id: Uuid,
    pub parent_module_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Rich text body (HTML produced by the editor).
    pub content: String,
    pub status: ContentStatus,
    pub sort_order: i32,
    /// Dotted hierarchical position, e.g. "2.1.3".
    pub module_number: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ModuleTree
///
/// Nested, content-free view of a module forest used by tables of contents.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModuleTree {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub module_number: String,
    pub status: ContentStatus,
    pub sort_order: i32,
    #[schema(no_recursion)]
    pub children: Vec<ModuleTree>,
}

/// ModuleDetail
///
/// A module together with its direct children, for the reader view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModuleDetail {
    pub module: Module,
    pub children: Vec<Module>,
}

/// Course
///
/// An ordered collection of modules, joined through `course_modules`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: ContentStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseDetail {
    pub course: Course,
    /// Modules in course order.
    pub modules: Vec<Module>,
}

/// ModuleProgress
///
/// One student's state on one module (`module_progress`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ModuleProgress {
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub status: ProgressStatus,
    #[ts(type = "string | null")]
    pub started_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CourseTracking
///
/// A student's enrolment in a course and the derived completion percentage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CourseTracking {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: TrackingStatus,
    /// 0..=100, completed modules over total modules in the course, rounded down.
    pub completion_percentage: i32,
    #[ts(type = "string")]
    pub enrolled_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub last_accessed_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// LearningPath
///
/// A curated, ordered sequence of courses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct LearningPath {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: ContentStatus,
    pub course_ids: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Playground
///
/// A user-owned scratch document, optionally attached to the module it was opened from.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Playground {
    pub id: Uuid,
    pub user_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    pub language: String,
    pub source: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// SearchResult
///
/// A published module or course matching a search query.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct SearchResult {
    /// "module" | "course"
    pub kind: String,
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub module_number: Option<String>,
}

// --- Dashboard & Profile Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_faculty: i64,
    pub total_modules: i64,
    pub published_modules: i64,
    pub total_courses: i64,
    pub published_courses: i64,
    pub total_enrollments: i64,
    pub completed_enrollments: i64,
}

/// UserProfile
///
/// Output schema for the current session (GET /api/auth/session).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateModuleRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Nest the new module under this parent; it is appended after existing children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_module_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

/// UpdateModuleRequest
///
/// Partial update. The slug is fixed at creation so existing links keep working.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateModuleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

/// MoveModuleRequest
///
/// Re-parents a module. `parent_module_id: null` makes it a root; `position` is the
/// zero-based slot among the new siblings (clamped, defaults to the end).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MoveModuleRequest {
    #[serde(default)]
    pub parent_module_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

/// ReorderModulesRequest
///
/// The complete, new order of the children of `parent_module_id` (or of the caller's
/// root modules when null).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReorderModulesRequest {
    #[serde(default)]
    pub parent_module_id: Option<Uuid>,
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

/// SetCourseModulesRequest
///
/// Replaces the course's module list. Order is significant; repeated ids keep their
/// first position.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SetCourseModulesRequest {
    pub module_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateModuleProgressRequest {
    pub status: ProgressStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateLearningPathRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub course_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateLearningPathRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePlaygroundRequest {
    pub title: String,
    pub language: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePlaygroundRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for module media.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    pub module_id: Uuid,
    #[schema(example = "figure_1.png")]
    pub filename: String,
    #[schema(example = "image/png")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to embed in module content.
    pub resource_key: String,
}

// --- Internal write models (never exposed over HTTP) ---

/// Fully resolved insert payload for `modules`; id, slug and position are decided by the
/// handler so the layout can be planned before the insert.
#[derive(Debug, Clone)]
pub struct NewModule {
    pub id: Uuid,
    pub author_id: Uuid,
    pub parent_module_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub content: String,
    pub status: ContentStatus,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: ContentStatus,
}

#[derive(Debug, Clone)]
pub struct NewLearningPath {
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: ContentStatus,
    pub course_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewPlayground {
    pub user_id: Uuid,
    pub module_id: Option<Uuid>,
    pub title: String,
    pub language: String,
    pub source: String,
}

// --- Validation ---

fn check_title(title: &str) -> AppResult<()> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation("title must not be empty"));
    }
    if len > MAX_TITLE_LEN {
        return Err(AppError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn check_max(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn check_language(language: &str) -> AppResult<()> {
    let len = language.trim().chars().count();
    if len == 0 || len > MAX_LANGUAGE_LEN {
        return Err(AppError::validation(format!(
            "language must be 1 to {} characters",
            MAX_LANGUAGE_LEN
        )));
    }
    Ok(())
}

impl CreateModuleRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_title(&self.title)?;
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(content) = &self.content {
            check_max("content", content, MAX_CONTENT_LEN)?;
        }
        Ok(())
    }
}

impl UpdateModuleRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(content) = &self.content {
            check_max("content", content, MAX_CONTENT_LEN)?;
        }
        Ok(())
    }
}

impl CreateCourseRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_title(&self.title)?;
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}

impl UpdateCourseRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}

impl CreateLearningPathRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_title(&self.title)?;
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}

impl UpdateLearningPathRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_max("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}

impl CreatePlaygroundRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_title(&self.title)?;
        check_language(&self.language)?;
        check_max("source", &self.source, MAX_SOURCE_LEN)
    }
}

impl UpdatePlaygroundRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(language) = &self.language {
            check_language(language)?;
        }
        if let Some(source) = &self.source {
            check_max("source", source, MAX_SOURCE_LEN)?;
        }
        Ok(())
    }
}
