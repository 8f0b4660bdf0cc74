#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response};
use chrono::Utc;
use etextbook_api::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::AppResult,
    models::{
        AdminDashboardStats, ContentStatus, Course, CourseTracking, LearningPath, Module,
        ModuleProgress, NewCourse, NewLearningPath, NewModule, NewPlayground, Playground,
        ProgressStatus, SearchResult, UpdateCourseRequest, UpdateLearningPathRequest,
        UpdateModuleRequest, UpdatePlaygroundRequest, User, UserRole,
    },
    progress,
    repository::{Repository, SlugScope},
    storage::MockStorageService,
    tree::{ModuleLayout, ModuleNode},
};
use serde::de::DeserializeOwned;
use sqlx::error::{DatabaseError, ErrorKind};
use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// --- IN-MEMORY REPOSITORY ---

// Behaves like the Postgres implementation closely enough for handler tests: visibility
// filters, owner scoping, slug lookups and tracking recomputation all happen here.

#[derive(Default)]
pub struct Store {
    pub users: Vec<User>,
    pub modules: Vec<Module>,
    pub courses: Vec<Course>,
    /// (course_id, module_id, sort_order)
    pub course_modules: Vec<(Uuid, Uuid, i32)>,
    pub progress: Vec<ModuleProgress>,
    pub tracking: Vec<CourseTracking>,
    pub paths: Vec<LearningPath>,
    pub playgrounds: Vec<Playground>,
    pub stats: AdminDashboardStats,
    pub search_results: Vec<SearchResult>,
    /// Every (query, limit) the search handler forwarded.
    pub search_calls: Vec<(String, i64)>,
    /// Number of layout rows written across all calls.
    pub layout_writes: usize,
    /// Calls to the standalone `apply_module_layout`, outside create and delete.
    pub layout_calls: usize,
    /// Returned once by the next `create_module`, as if Postgres had rejected the insert.
    pub fail_next_insert: Option<sqlx::Error>,
}

#[derive(Default)]
pub struct InMemoryRepo {
    pub store: Mutex<Store>,
}

impl InMemoryRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.store.lock().unwrap();
        f(&mut store)
    }

    pub fn module(&self, id: Uuid) -> Module {
        self.with(|s| s.modules.iter().find(|m| m.id == id).cloned().unwrap())
    }
}

fn number_key(number: &str) -> Vec<u32> {
    number.split('.').filter_map(|part| part.parse().ok()).collect()
}

fn refresh(store: &mut Store, user_id: Option<Uuid>, course_ids: &[Uuid], touch: bool) {
    let now = Utc::now();
    let Store {
        tracking,
        course_modules,
        progress: module_progress,
        ..
    } = store;

    for row in tracking
        .iter_mut()
        .filter(|t| course_ids.contains(&t.course_id))
        .filter(|t| user_id.is_none_or(|u| u == t.user_id))
    {
        let members: Vec<Uuid> = course_modules
            .iter()
            .filter(|(c, _, _)| *c == row.course_id)
            .map(|(_, m, _)| *m)
            .collect();
        let completed = module_progress
            .iter()
            .filter(|p| p.user_id == row.user_id && members.contains(&p.module_id))
            .filter(|p| p.status == ProgressStatus::Completed)
            .count();

        let pct = progress::completion_percentage(completed as i64, members.len() as i64);
        row.completion_percentage = pct;
        row.status = progress::tracking_status(pct);
        row.completed_at = progress::tracking_completed_at(row.status, row.completed_at, now);
        if touch {
            row.last_accessed_at = now;
        }
    }
}

fn write_layout(store: &mut Store, layout: &[ModuleLayout]) {
    for entry in layout {
        if let Some(m) = store.modules.iter_mut().find(|m| m.id == entry.id) {
            m.parent_module_id = entry.parent_id;
            m.sort_order = entry.sort_order;
            m.module_number = entry.module_number.clone();
        }
    }
    store.layout_writes += layout.len();
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.with(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.with(|s| s.users.clone()))
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        Ok(self.with(|s| {
            s.users.iter_mut().find(|u| u.id == id).map(|u| {
                u.role = role;
                u.clone()
            })
        }))
    }

    async fn taken_slugs(&self, scope: SlugScope, base: &str) -> AppResult<Vec<String>> {
        let prefix = format!("{}-", base);
        Ok(self.with(|s| {
            let slugs: Vec<String> = match scope {
                SlugScope::Module => s.modules.iter().map(|m| m.slug.clone()).collect(),
                SlugScope::Course => s.courses.iter().map(|c| c.slug.clone()).collect(),
                SlugScope::LearningPath => s.paths.iter().map(|p| p.slug.clone()).collect(),
            };
            slugs
                .into_iter()
                .filter(|slug| slug == base || slug.starts_with(&prefix))
                .collect()
        }))
    }

    async fn get_module(&self, id: Uuid) -> AppResult<Option<Module>> {
        Ok(self.with(|s| s.modules.iter().find(|m| m.id == id).cloned()))
    }

    async fn get_modules_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Module>> {
        Ok(self.with(|s| {
            s.modules
                .iter()
                .filter(|m| ids.contains(&m.id))
                .cloned()
                .collect()
        }))
    }

    async fn list_modules_by_author(&self, author_id: Uuid) -> AppResult<Vec<Module>> {
        let mut modules: Vec<Module> = self.with(|s| {
            s.modules
                .iter()
                .filter(|m| m.author_id == author_id)
                .cloned()
                .collect()
        });
        modules.sort_by_key(|m| number_key(&m.module_number));
        Ok(modules)
    }

    async fn list_published_modules(&self, author_id: Option<Uuid>) -> AppResult<Vec<Module>> {
        let mut modules: Vec<Module> = self.with(|s| {
            s.modules
                .iter()
                .filter(|m| m.status == ContentStatus::Published)
                .filter(|m| author_id.is_none_or(|a| a == m.author_id))
                .cloned()
                .collect()
        });
        modules.sort_by_key(|m| number_key(&m.module_number));
        Ok(modules)
    }

    async fn get_module_nodes(&self, author_id: Uuid) -> AppResult<Vec<ModuleNode>> {
        Ok(self.with(|s| {
            s.modules
                .iter()
                .filter(|m| m.author_id == author_id)
                .map(|m| ModuleNode {
                    id: m.id,
                    parent_id: m.parent_module_id,
                    sort_order: m.sort_order,
                    module_number: m.module_number.clone(),
                    title: m.title.clone(),
                })
                .collect()
        }))
    }

    async fn create_module(&self, module: NewModule, layout: &[ModuleLayout]) -> AppResult<Module> {
        if let Some(err) = self.with(|s| s.fail_next_insert.take()) {
            return Err(err.into());
        }
        let now = Utc::now();
        let created = Module {
            id: module.id,
            author_id: module.author_id,
            parent_module_id: module.parent_module_id,
            title: module.title,
            slug: module.slug,
            description: module.description,
            content: module.content,
            status: module.status,
            sort_order: module.sort_order,
            module_number: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.with(|s| {
            s.modules.push(created);
            write_layout(s, layout);
        });
        Ok(self.module(module.id))
    }

    async fn update_module(&self, id: Uuid, req: UpdateModuleRequest) -> AppResult<Option<Module>> {
        Ok(self.with(|s| {
            s.modules.iter_mut().find(|m| m.id == id).map(|m| {
                if let Some(title) = req.title {
                    m.title = title.trim().to_string();
                }
                if let Some(description) = req.description {
                    m.description = description;
                }
                if let Some(content) = req.content {
                    m.content = content;
                }
                if let Some(status) = req.status {
                    m.status = status;
                }
                m.updated_at = Utc::now();
                m.clone()
            })
        }))
    }

    async fn delete_modules(&self, ids: &[Uuid], layout: &[ModuleLayout]) -> AppResult<u64> {
        Ok(self.with(|s| {
            let course_ids: Vec<Uuid> = s
                .course_modules
                .iter()
                .filter(|(_, m, _)| ids.contains(m))
                .map(|(c, _, _)| *c)
                .collect();

            let before = s.modules.len();
            s.modules.retain(|m| !ids.contains(&m.id));
            s.course_modules.retain(|(_, m, _)| !ids.contains(m));
            s.progress.retain(|p| !ids.contains(&p.module_id));
            write_layout(s, layout);
            refresh(s, None, &course_ids, false);
            (before - s.modules.len()) as u64
        }))
    }

    async fn apply_module_layout(&self, layout: &[ModuleLayout]) -> AppResult<()> {
        self.with(|s| {
            s.layout_calls += 1;
            write_layout(s, layout);
        });
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> AppResult<Option<Course>> {
        Ok(self.with(|s| s.courses.iter().find(|c| c.id == id).cloned()))
    }

    async fn list_published_courses(&self, search: Option<String>) -> AppResult<Vec<Course>> {
        let needle = search.map(|q| q.trim().to_lowercase());
        Ok(self.with(|s| {
            s.courses
                .iter()
                .filter(|c| c.status == ContentStatus::Published)
                .filter(|c| {
                    needle.as_deref().is_none_or(|q| {
                        c.title.to_lowercase().contains(q)
                            || c.description.to_lowercase().contains(q)
                    })
                })
                .cloned()
                .collect()
        }))
    }

    async fn list_courses_by_author(&self, author_id: Uuid) -> AppResult<Vec<Course>> {
        Ok(self.with(|s| {
            s.courses
                .iter()
                .filter(|c| c.author_id == author_id)
                .cloned()
                .collect()
        }))
    }

    async fn create_course(&self, course: NewCourse) -> AppResult<Course> {
        let now = Utc::now();
        let created = Course {
            id: Uuid::new_v4(),
            author_id: course.author_id,
            title: course.title,
            slug: course.slug,
            description: course.description,
            status: course.status,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.courses.push(created.clone()));
        Ok(created)
    }

    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> AppResult<Option<Course>> {
        Ok(self.with(|s| {
            s.courses.iter_mut().find(|c| c.id == id).map(|c| {
                if let Some(title) = req.title {
                    c.title = title.trim().to_string();
                }
                if let Some(description) = req.description {
                    c.description = description;
                }
                if let Some(status) = req.status {
                    c.status = status;
                }
                c.clone()
            })
        }))
    }

    async fn delete_course(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.courses.len();
            s.courses.retain(|c| c.id != id);
            s.course_modules.retain(|(c, _, _)| *c != id);
            s.tracking.retain(|t| t.course_id != id);
            before != s.courses.len()
        }))
    }

    async fn get_course_modules(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> AppResult<Vec<Module>> {
        Ok(self.with(|s| {
            let mut members: Vec<(i32, Uuid)> = s
                .course_modules
                .iter()
                .filter(|(c, _, _)| *c == course_id)
                .map(|(_, m, order)| (*order, *m))
                .collect();
            members.sort();
            members
                .into_iter()
                .filter_map(|(_, id)| s.modules.iter().find(|m| m.id == id).cloned())
                .filter(|m| !published_only || m.status == ContentStatus::Published)
                .collect()
        }))
    }

    async fn set_course_modules(&self, course_id: Uuid, module_ids: &[Uuid]) -> AppResult<()> {
        self.with(|s| {
            s.course_modules.retain(|(c, _, _)| *c != course_id);
            for (position, module_id) in module_ids.iter().enumerate() {
                s.course_modules.push((course_id, *module_id, position as i32));
            }
            refresh(s, None, &[course_id], false);
        });
        Ok(())
    }

    async fn list_module_progress(&self, user_id: Uuid) -> AppResult<Vec<ModuleProgress>> {
        Ok(self.with(|s| {
            s.progress
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn upsert_module_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        status: ProgressStatus,
    ) -> AppResult<ModuleProgress> {
        let now = Utc::now();
        Ok(self.with(|s| {
            let previous = s
                .progress
                .iter()
                .find(|p| p.user_id == user_id && p.module_id == module_id)
                .cloned();
            let stamps = progress::transition(previous.as_ref(), status, now);
            let saved = ModuleProgress {
                user_id,
                module_id,
                status,
                started_at: stamps.started_at,
                completed_at: stamps.completed_at,
                updated_at: now,
            };
            s.progress
                .retain(|p| !(p.user_id == user_id && p.module_id == module_id));
            s.progress.push(saved.clone());

            let courses: Vec<Uuid> = s
                .course_modules
                .iter()
                .filter(|(_, m, _)| *m == module_id)
                .map(|(c, _, _)| *c)
                .collect();
            refresh(s, Some(user_id), &courses, true);
            saved
        }))
    }

    async fn list_course_tracking(&self, user_id: Uuid) -> AppResult<Vec<CourseTracking>> {
        Ok(self.with(|s| {
            s.tracking
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_course_tracking(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<Option<CourseTracking>> {
        Ok(self.with(|s| {
            s.tracking
                .iter()
                .find(|t| t.user_id == user_id && t.course_id == course_id)
                .cloned()
        }))
    }

    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<Option<CourseTracking>> {
        let now = Utc::now();
        Ok(self.with(|s| {
            if s.tracking
                .iter()
                .any(|t| t.user_id == user_id && t.course_id == course_id)
            {
                return None;
            }
            s.tracking.push(CourseTracking {
                user_id,
                course_id,
                enrolled_at: now,
                last_accessed_at: now,
                ..CourseTracking::default()
            });
            refresh(s, Some(user_id), &[course_id], false);
            s.tracking
                .iter()
                .find(|t| t.user_id == user_id && t.course_id == course_id)
                .cloned()
        }))
    }

    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.tracking.len();
            s.tracking
                .retain(|t| !(t.user_id == user_id && t.course_id == course_id));
            before != s.tracking.len()
        }))
    }

    async fn get_learning_path(&self, id: Uuid) -> AppResult<Option<LearningPath>> {
        Ok(self.with(|s| s.paths.iter().find(|p| p.id == id).cloned()))
    }

    async fn list_published_learning_paths(&self) -> AppResult<Vec<LearningPath>> {
        Ok(self.with(|s| {
            s.paths
                .iter()
                .filter(|p| p.status == ContentStatus::Published)
                .cloned()
                .collect()
        }))
    }

    async fn list_learning_paths_by_author(&self, author_id: Uuid) -> AppResult<Vec<LearningPath>> {
        Ok(self.with(|s| {
            s.paths
                .iter()
                .filter(|p| p.author_id == author_id)
                .cloned()
                .collect()
        }))
    }

    async fn create_learning_path(&self, path: NewLearningPath) -> AppResult<LearningPath> {
        let now = Utc::now();
        let created = LearningPath {
            id: Uuid::new_v4(),
            author_id: path.author_id,
            title: path.title,
            slug: path.slug,
            description: path.description,
            status: path.status,
            course_ids: path.course_ids,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.paths.push(created.clone()));
        Ok(created)
    }

    async fn update_learning_path(
        &self,
        id: Uuid,
        req: UpdateLearningPathRequest,
    ) -> AppResult<Option<LearningPath>> {
        Ok(self.with(|s| {
            s.paths.iter_mut().find(|p| p.id == id).map(|p| {
                if let Some(title) = req.title {
                    p.title = title.trim().to_string();
                }
                if let Some(description) = req.description {
                    p.description = description;
                }
                if let Some(status) = req.status {
                    p.status = status;
                }
                if let Some(course_ids) = req.course_ids {
                    p.course_ids = course_ids;
                }
                p.clone()
            })
        }))
    }

    async fn delete_learning_path(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.paths.len();
            s.paths.retain(|p| p.id != id);
            before != s.paths.len()
        }))
    }

    async fn existing_course_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        Ok(self.with(|s| {
            s.courses
                .iter()
                .map(|c| c.id)
                .filter(|id| ids.contains(id))
                .collect()
        }))
    }

    async fn list_playgrounds(&self, user_id: Uuid) -> AppResult<Vec<Playground>> {
        Ok(self.with(|s| {
            s.playgrounds
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Playground>> {
        Ok(self.with(|s| {
            s.playgrounds
                .iter()
                .find(|p| p.id == id && p.user_id == user_id)
                .cloned()
        }))
    }

    async fn create_playground(&self, playground: NewPlayground) -> AppResult<Playground> {
        let now = Utc::now();
        let created = Playground {
            id: Uuid::new_v4(),
            user_id: playground.user_id,
            module_id: playground.module_id,
            title: playground.title,
            language: playground.language,
            source: playground.source,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.playgrounds.push(created.clone()));
        Ok(created)
    }

    async fn update_playground(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdatePlaygroundRequest,
    ) -> AppResult<Option<Playground>> {
        Ok(self.with(|s| {
            s.playgrounds
                .iter_mut()
                .find(|p| p.id == id && p.user_id == user_id)
                .map(|p| {
                    if let Some(title) = req.title {
                        p.title = title.trim().to_string();
                    }
                    if let Some(language) = req.language {
                        p.language = language.trim().to_string();
                    }
                    if let Some(source) = req.source {
                        p.source = source;
                    }
                    p.clone()
                })
        }))
    }

    async fn delete_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.playgrounds.len();
            s.playgrounds
                .retain(|p| !(p.id == id && p.user_id == user_id));
            before != s.playgrounds.len()
        }))
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<SearchResult>> {
        Ok(self.with(|s| {
            s.search_calls.push((query.to_string(), limit));
            s.search_results.clone()
        }))
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        Ok(self.with(|s| s.stats.clone()))
    }
}

// --- FIXTURES ---

pub fn app_state(repo: Arc<InMemoryRepo>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

pub fn seed_user(repo: &InMemoryRepo, role: UserRole) -> User {
    let id = Uuid::new_v4();
    let user = User {
        id,
        email: format!("{}@example.edu", id.simple()),
        name: format!("{:?} user", role),
        role,
        ..User::default()
    };
    repo.with(|s| s.users.push(user.clone()));
    user
}

pub fn as_auth(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

/// Inserts a module directly, bypassing the layout pass.
pub fn seed_module(
    repo: &InMemoryRepo,
    author_id: Uuid,
    parent_module_id: Option<Uuid>,
    title: &str,
    sort_order: i32,
    status: ContentStatus,
) -> Module {
    let module = Module {
        id: Uuid::new_v4(),
        author_id,
        parent_module_id,
        title: title.to_string(),
        slug: etextbook_api::slug::slugify(title),
        status,
        sort_order,
        ..Module::default()
    };
    repo.with(|s| s.modules.push(module.clone()));
    module
}

pub fn seed_course(repo: &InMemoryRepo, author_id: Uuid, title: &str, status: ContentStatus) -> Course {
    let course = Course {
        id: Uuid::new_v4(),
        author_id,
        title: title.to_string(),
        slug: etextbook_api::slug::slugify(title),
        status,
        ..Course::default()
    };
    repo.with(|s| s.courses.push(course.clone()));
    course
}

/// A Postgres-shaped database error carrying an arbitrary SQLSTATE.
#[derive(Debug)]
pub struct FakeDbError {
    pub code: &'static str,
}

impl FakeDbError {
    pub fn unique_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { code: "23505" }))
    }
}

impl fmt::Display for FakeDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "database error {}", self.code)
    }
}

impl std::error::Error for FakeDbError {}

impl DatabaseError for FakeDbError {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        match self.code {
            "23505" => ErrorKind::UniqueViolation,
            _ => ErrorKind::Other,
        }
    }
}

pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
