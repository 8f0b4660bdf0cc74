use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, query_builder::QueryBuilder};
use std::future::Future;
use uuid::Uuid;

use super::{Repository, SlugScope};
use crate::{
    error::AppResult,
    models::{
        AdminDashboardStats, Course, CourseTracking, LearningPath, Module, ModuleProgress,
        NewCourse, NewLearningPath, NewModule, NewPlayground, Playground, ProgressStatus,
        SearchResult, UpdateCourseRequest, UpdateLearningPathRequest, UpdateModuleRequest,
        UpdatePlaygroundRequest, User, UserRole,
    },
    progress,
    retry::{RetryPolicy, with_retry},
    tree::{ModuleLayout, ModuleNode},
};

macro_rules! user_columns {
    () => {
        "id, email, name, role, created_at, updated_at"
    };
}

macro_rules! module_columns {
    () => {
        "id, author_id, parent_module_id, title, slug, description, content, status, \
         sort_order, module_number, created_at, updated_at"
    };
}

macro_rules! course_columns {
    () => {
        "id, author_id, title, slug, description, status, created_at, updated_at"
    };
}

macro_rules! progress_columns {
    () => {
        "user_id, module_id, status, started_at, completed_at, updated_at"
    };
}

macro_rules! tracking_columns {
    () => {
        "user_id, course_id, status, completion_percentage, enrolled_at, last_accessed_at, \
         completed_at"
    };
}

macro_rules! path_columns {
    () => {
        "id, author_id, title, slug, description, status, course_ids, created_at, updated_at"
    };
}

macro_rules! playground_columns {
    () => {
        "id, user_id, module_id, title, language, source, created_at, updated_at"
    };
}

/// Orders modules depth-first by their dotted number ("2" before "10").
const MODULE_NUMBER_ORDER: &str = "string_to_array(module_number, '.')::int[]";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Every call goes through the
/// configured retry policy; multi-statement writes run inside one transaction which is
/// retried as a whole.
pub struct PostgresRepository {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_retry_policy(pool, RetryPolicy::default())
    }

    pub fn with_retry_policy(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Runs `op` against a fresh pool handle under the retry policy.
    async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut(PgPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let pool = &self.pool;
        let result = with_retry(&self.retry, operation, || op(pool.clone())).await;
        if let Err(e) = &result {
            // AppError logs the failure once it becomes a response.
            tracing::debug!("{} failed: {:?}", operation, e);
        }
        Ok(result?)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE patterns.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(FromRow)]
struct TrackingCounts {
    user_id: Uuid,
    course_id: Uuid,
    completed_at: Option<DateTime<Utc>>,
    total: i64,
    completed: i64,
}

/// refresh_tracking
///
/// Recomputes completion for existing `course_tracking` rows of `course_ids`, optionally
/// limited to one user. `touch` also bumps `last_accessed_at`.
async fn refresh_tracking(
    conn: &mut PgConnection,
    user_id: Option<Uuid>,
    course_ids: &[Uuid],
    touch: bool,
) -> Result<(), sqlx::Error> {
    if course_ids.is_empty() {
        return Ok(());
    }

    let rows = sqlx::query_as::<_, TrackingCounts>(
        r#"
        SELECT
            ct.user_id,
            ct.course_id,
            ct.completed_at,
            (SELECT COUNT(*) FROM course_modules cm WHERE cm.course_id = ct.course_id) AS total,
            (SELECT COUNT(*)
               FROM course_modules cm
               JOIN module_progress mp
                 ON mp.module_id = cm.module_id AND mp.user_id = ct.user_id
              WHERE cm.course_id = ct.course_id AND mp.status = 'completed') AS completed
        FROM course_tracking ct
        WHERE ct.course_id = ANY($1) AND ($2::uuid IS NULL OR ct.user_id = $2)
        "#,
    )
    .bind(course_ids)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let now = Utc::now();
    for row in rows {
        let percentage = progress::completion_percentage(row.completed, row.total);
        let status = progress::tracking_status(percentage);
        let completed_at = progress::tracking_completed_at(status, row.completed_at, now);

        sqlx::query(
            r#"
            UPDATE course_tracking
               SET completion_percentage = $3,
                   status = $4,
                   completed_at = $5,
                   last_accessed_at = CASE WHEN $6 THEN NOW() ELSE last_accessed_at END
             WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(row.user_id)
        .bind(row.course_id)
        .bind(percentage)
        .bind(status)
        .bind(completed_at)
        .bind(touch)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Writes parent, sort order and number for each layout entry.
async fn write_layout(conn: &mut PgConnection, layout: &[ModuleLayout]) -> Result<(), sqlx::Error> {
    for entry in layout {
        sqlx::query(
            "UPDATE modules SET parent_module_id = $2, sort_order = $3, module_number = $4 \
             WHERE id = $1",
        )
        .bind(entry.id)
        .bind(entry.parent_id)
        .bind(entry.sort_order)
        .bind(&entry.module_number)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.run("get_user", |pool| async move {
            sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&pool)
                .await
        })
        .await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.run("list_users", |pool| async move {
            sqlx::query_as::<_, User>(concat!(
                "SELECT ",
                user_columns!(),
                " FROM users ORDER BY created_at ASC"
            ))
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> AppResult<Option<User>> {
        self.run("set_user_role", |pool| async move {
            sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING ",
                user_columns!()
            ))
            .bind(id)
            .bind(role)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    /// taken_slugs
    ///
    /// The table name comes from a closed enum, never from input.
    async fn taken_slugs(&self, scope: SlugScope, base: &str) -> AppResult<Vec<String>> {
        let sql = format!(
            "SELECT slug FROM {} WHERE slug = $1 OR slug LIKE $2",
            scope.table()
        );
        let pattern = format!("{}-%", escape_like(base));
        let (sql, pattern) = (sql.as_str(), pattern.as_str());
        self.run("taken_slugs", |pool| async move {
            sqlx::query_scalar::<_, String>(sql)
                .bind(base)
                .bind(pattern)
                .fetch_all(&pool)
                .await
        })
        .await
    }

    // --- MODULES ---

    async fn get_module(&self, id: Uuid) -> AppResult<Option<Module>> {
        self.run("get_module", |pool| async move {
            sqlx::query_as::<_, Module>(concat!(
                "SELECT ",
                module_columns!(),
                " FROM modules WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn get_modules_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Module>> {
        self.run("get_modules_by_ids", |pool| async move {
            sqlx::query_as::<_, Module>(concat!(
                "SELECT ",
                module_columns!(),
                " FROM modules WHERE id = ANY($1)"
            ))
            .bind(ids)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn list_modules_by_author(&self, author_id: Uuid) -> AppResult<Vec<Module>> {
        let sql = format!(
            "SELECT {} FROM modules WHERE author_id = $1 ORDER BY {}, created_at",
            module_columns!(),
            MODULE_NUMBER_ORDER
        );
        let sql = sql.as_str();
        self.run("list_modules_by_author", |pool| async move {
            sqlx::query_as::<_, Module>(sql)
                .bind(author_id)
                .fetch_all(&pool)
                .await
        })
        .await
    }

    async fn list_published_modules(&self, author_id: Option<Uuid>) -> AppResult<Vec<Module>> {
        let sql = format!(
            "SELECT {} FROM modules \
             WHERE status = 'published' AND ($1::uuid IS NULL OR author_id = $1) \
             ORDER BY author_id, {}, created_at",
            module_columns!(),
            MODULE_NUMBER_ORDER
        );
        let sql = sql.as_str();
        self.run("list_published_modules", |pool| async move {
            sqlx::query_as::<_, Module>(sql)
                .bind(author_id)
                .fetch_all(&pool)
                .await
        })
        .await
    }

    async fn get_module_nodes(&self, author_id: Uuid) -> AppResult<Vec<ModuleNode>> {
        self.run("get_module_nodes", |pool| async move {
            sqlx::query_as::<_, ModuleNode>(
                r#"SELECT id, parent_module_id AS parent_id, sort_order, module_number, title
                   FROM modules WHERE author_id = $1"#,
            )
            .bind(author_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    /// create_module
    ///
    /// The id comes from the caller so a retried transaction cannot create a second row.
    async fn create_module(&self, module: NewModule, layout: &[ModuleLayout]) -> AppResult<Module> {
        let module = &module;
        self.run("create_module", |pool| async move {
            let mut tx = pool.begin().await?;

            sqlx::query(
                "INSERT INTO modules (id, author_id, parent_module_id, title, slug, description, \
                 content, status, sort_order, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())",
            )
            .bind(module.id)
            .bind(module.author_id)
            .bind(module.parent_module_id)
            .bind(&module.title)
            .bind(&module.slug)
            .bind(&module.description)
            .bind(&module.content)
            .bind(module.status)
            .bind(module.sort_order)
            .execute(&mut *tx)
            .await?;

            write_layout(&mut tx, layout).await?;

            let created = sqlx::query_as::<_, Module>(concat!(
                "SELECT ",
                module_columns!(),
                " FROM modules WHERE id = $1"
            ))
            .bind(module.id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    /// update_module
    ///
    /// COALESCE keeps every column the request leaves as `None`.
    async fn update_module(&self, id: Uuid, req: UpdateModuleRequest) -> AppResult<Option<Module>> {
        let req = &req;
        self.run("update_module", |pool| async move {
            sqlx::query_as::<_, Module>(concat!(
                "UPDATE modules \
                 SET title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     content = COALESCE($4, content), \
                     status = COALESCE($5, status), \
                     updated_at = NOW() \
                 WHERE id = $1 RETURNING ",
                module_columns!()
            ))
            .bind(id)
            .bind(req.title.as_deref().map(str::trim))
            .bind(req.description.as_deref())
            .bind(req.content.as_deref())
            .bind(req.status)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    /// delete_modules
    ///
    /// Course membership and progress rows cascade with the modules, so the affected
    /// courses are collected first and their enrolments recomputed afterwards.
    async fn delete_modules(&self, ids: &[Uuid], layout: &[ModuleLayout]) -> AppResult<u64> {
        self.run("delete_modules", |pool| async move {
            let mut tx = pool.begin().await?;

            let course_ids: Vec<Uuid> = sqlx::query_scalar(
                "SELECT DISTINCT course_id FROM course_modules WHERE module_id = ANY($1)",
            )
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;

            let removed = sqlx::query("DELETE FROM modules WHERE id = ANY($1)")
                .bind(ids)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            write_layout(&mut tx, layout).await?;
            refresh_tracking(&mut tx, None, &course_ids, false).await?;

            tx.commit().await?;
            Ok(removed)
        })
        .await
    }

    async fn apply_module_layout(&self, layout: &[ModuleLayout]) -> AppResult<()> {
        if layout.is_empty() {
            return Ok(());
        }
        self.run("apply_module_layout", |pool| async move {
            let mut tx = pool.begin().await?;
            write_layout(&mut tx, layout).await?;
            tx.commit().await
        })
        .await
    }

    // --- COURSES ---

    async fn get_course(&self, id: Uuid) -> AppResult<Option<Course>> {
        self.run("get_course", |pool| async move {
            sqlx::query_as::<_, Course>(concat!(
                "SELECT ",
                course_columns!(),
                " FROM courses WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    /// list_published_courses
    ///
    /// QueryBuilder keeps the optional search parameterised.
    async fn list_published_courses(&self, search: Option<String>) -> AppResult<Vec<Course>> {
        let pattern = search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        let pattern = pattern.as_deref();

        self.run("list_published_courses", |pool| async move {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(concat!(
                "SELECT ",
                course_columns!(),
                " FROM courses WHERE status = 'published'"
            ));
            if let Some(pattern) = pattern {
                builder.push(" AND (title ILIKE ");
                builder.push_bind(pattern);
                builder.push(" OR description ILIKE ");
                builder.push_bind(pattern);
                builder.push(")");
            }
            builder.push(" ORDER BY title ASC");
            builder.build_query_as::<Course>().fetch_all(&pool).await
        })
        .await
    }

    async fn list_courses_by_author(&self, author_id: Uuid) -> AppResult<Vec<Course>> {
        self.run("list_courses_by_author", |pool| async move {
            sqlx::query_as::<_, Course>(concat!(
                "SELECT ",
                course_columns!(),
                " FROM courses WHERE author_id = $1 ORDER BY updated_at DESC"
            ))
            .bind(author_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn create_course(&self, course: NewCourse) -> AppResult<Course> {
        let id = Uuid::new_v4();
        let course = &course;
        self.run("create_course", |pool| async move {
            sqlx::query_as::<_, Course>(concat!(
                "INSERT INTO courses (id, author_id, title, slug, description, status, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING ",
                course_columns!()
            ))
            .bind(id)
            .bind(course.author_id)
            .bind(&course.title)
            .bind(&course.slug)
            .bind(&course.description)
            .bind(course.status)
            .fetch_one(&pool)
            .await
        })
        .await
    }

    async fn update_course(&self, id: Uuid, req: UpdateCourseRequest) -> AppResult<Option<Course>> {
        let req = &req;
        self.run("update_course", |pool| async move {
            sqlx::query_as::<_, Course>(concat!(
                "UPDATE courses \
                 SET title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     status = COALESCE($4, status), \
                     updated_at = NOW() \
                 WHERE id = $1 RETURNING ",
                course_columns!()
            ))
            .bind(id)
            .bind(req.title.as_deref().map(str::trim))
            .bind(req.description.as_deref())
            .bind(req.status)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn delete_course(&self, id: Uuid) -> AppResult<bool> {
        self.run("delete_course", |pool| async move {
            sqlx::query("DELETE FROM courses WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await
                .map(|res| res.rows_affected() > 0)
        })
        .await
    }

    async fn get_course_modules(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> AppResult<Vec<Module>> {
        self.run("get_course_modules", |pool| async move {
            sqlx::query_as::<_, Module>(
                r#"
                SELECT m.id, m.author_id, m.parent_module_id, m.title, m.slug, m.description,
                       m.content, m.status, m.sort_order, m.module_number, m.created_at, m.updated_at
                FROM course_modules cm
                JOIN modules m ON m.id = cm.module_id
                WHERE cm.course_id = $1 AND (NOT $2 OR m.status = 'published')
                ORDER BY cm.sort_order ASC
                "#,
            )
            .bind(course_id)
            .bind(published_only)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    /// set_course_modules
    ///
    /// Replaces membership with `module_ids` in order (sort_order 0..n-1) and refreshes
    /// all enrolments in the same transaction.
    async fn set_course_modules(&self, course_id: Uuid, module_ids: &[Uuid]) -> AppResult<()> {
        self.run("set_course_modules", |pool| async move {
            let mut tx = pool.begin().await?;

            sqlx::query("DELETE FROM course_modules WHERE course_id = $1")
                .bind(course_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO course_modules (course_id, module_id, sort_order)
                SELECT $1, t.module_id, (t.ord - 1)::int
                FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(module_id, ord)
                "#,
            )
            .bind(course_id)
            .bind(module_ids)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE courses SET updated_at = NOW() WHERE id = $1")
                .bind(course_id)
                .execute(&mut *tx)
                .await?;

            refresh_tracking(&mut tx, None, &[course_id], false).await?;
            tx.commit().await
        })
        .await
    }

    // --- PROGRESS & TRACKING ---

    async fn list_module_progress(&self, user_id: Uuid) -> AppResult<Vec<ModuleProgress>> {
        self.run("list_module_progress", |pool| async move {
            sqlx::query_as::<_, ModuleProgress>(concat!(
                "SELECT ",
                progress_columns!(),
                " FROM module_progress WHERE user_id = $1 ORDER BY updated_at DESC"
            ))
            .bind(user_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    /// upsert_module_progress
    ///
    /// Locks the existing row, derives the new timestamps, writes them, and refreshes the
    /// user's tracking for every course containing the module.
    async fn upsert_module_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        status: ProgressStatus,
    ) -> AppResult<ModuleProgress> {
        self.run("upsert_module_progress", |pool| async move {
            let mut tx = pool.begin().await?;

            let previous = sqlx::query_as::<_, ModuleProgress>(concat!(
                "SELECT ",
                progress_columns!(),
                " FROM module_progress WHERE user_id = $1 AND module_id = $2 FOR UPDATE"
            ))
            .bind(user_id)
            .bind(module_id)
            .fetch_optional(&mut *tx)
            .await?;

            let stamps = progress::transition(previous.as_ref(), status, Utc::now());

            let saved = sqlx::query_as::<_, ModuleProgress>(concat!(
                "INSERT INTO module_progress (user_id, module_id, status, started_at, completed_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW()) \
                 ON CONFLICT (user_id, module_id) DO UPDATE \
                 SET status = EXCLUDED.status, \
                     started_at = EXCLUDED.started_at, \
                     completed_at = EXCLUDED.completed_at, \
                     updated_at = NOW() \
                 RETURNING ",
                progress_columns!()
            ))
            .bind(user_id)
            .bind(module_id)
            .bind(status)
            .bind(stamps.started_at)
            .bind(stamps.completed_at)
            .fetch_one(&mut *tx)
            .await?;

            let course_ids: Vec<Uuid> =
                sqlx::query_scalar("SELECT course_id FROM course_modules WHERE module_id = $1")
                    .bind(module_id)
                    .fetch_all(&mut *tx)
                    .await?;

            refresh_tracking(&mut tx, Some(user_id), &course_ids, true).await?;
            tx.commit().await?;
            Ok(saved)
        })
        .await
    }

    async fn list_course_tracking(&self, user_id: Uuid) -> AppResult<Vec<CourseTracking>> {
        self.run("list_course_tracking", |pool| async move {
            sqlx::query_as::<_, CourseTracking>(concat!(
                "SELECT ",
                tracking_columns!(),
                " FROM course_tracking WHERE user_id = $1 ORDER BY last_accessed_at DESC"
            ))
            .bind(user_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn get_course_tracking(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> AppResult<Option<CourseTracking>> {
        self.run("get_course_tracking", |pool| async move {
            sqlx::query_as::<_, CourseTracking>(concat!(
                "SELECT ",
                tracking_columns!(),
                " FROM course_tracking WHERE user_id = $1 AND course_id = $2"
            ))
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    /// enroll
    ///
    /// `ON CONFLICT DO NOTHING` makes a repeat enrolment a no-op that returns `None`.
    /// Modules completed before enrolling count immediately.
    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<Option<CourseTracking>> {
        self.run("enroll", |pool| async move {
            let mut tx = pool.begin().await?;

            let inserted = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO course_tracking (user_id, course_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING RETURNING course_id",
            )
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&mut *tx)
            .await?;

            if inserted.is_none() {
                tx.rollback().await?;
                return Ok(None);
            }

            refresh_tracking(&mut tx, Some(user_id), &[course_id], false).await?;

            let tracking = sqlx::query_as::<_, CourseTracking>(concat!(
                "SELECT ",
                tracking_columns!(),
                " FROM course_tracking WHERE user_id = $1 AND course_id = $2"
            ))
            .bind(user_id)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(Some(tracking))
        })
        .await
    }

    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> AppResult<bool> {
        self.run("unenroll", |pool| async move {
            sqlx::query("DELETE FROM course_tracking WHERE user_id = $1 AND course_id = $2")
                .bind(user_id)
                .bind(course_id)
                .execute(&pool)
                .await
                .map(|res| res.rows_affected() > 0)
        })
        .await
    }

    // --- LEARNING PATHS ---

    async fn get_learning_path(&self, id: Uuid) -> AppResult<Option<LearningPath>> {
        self.run("get_learning_path", |pool| async move {
            sqlx::query_as::<_, LearningPath>(concat!(
                "SELECT ",
                path_columns!(),
                " FROM learning_paths WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn list_published_learning_paths(&self) -> AppResult<Vec<LearningPath>> {
        self.run("list_published_learning_paths", |pool| async move {
            sqlx::query_as::<_, LearningPath>(concat!(
                "SELECT ",
                path_columns!(),
                " FROM learning_paths WHERE status = 'published' ORDER BY title ASC"
            ))
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn list_learning_paths_by_author(&self, author_id: Uuid) -> AppResult<Vec<LearningPath>> {
        self.run("list_learning_paths_by_author", |pool| async move {
            sqlx::query_as::<_, LearningPath>(concat!(
                "SELECT ",
                path_columns!(),
                " FROM learning_paths WHERE author_id = $1 ORDER BY updated_at DESC"
            ))
            .bind(author_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn create_learning_path(&self, path: NewLearningPath) -> AppResult<LearningPath> {
        let id = Uuid::new_v4();
        let path = &path;
        self.run("create_learning_path", |pool| async move {
            sqlx::query_as::<_, LearningPath>(concat!(
                "INSERT INTO learning_paths (id, author_id, title, slug, description, status, course_ids, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING ",
                path_columns!()
            ))
            .bind(id)
            .bind(path.author_id)
            .bind(&path.title)
            .bind(&path.slug)
            .bind(&path.description)
            .bind(path.status)
            .bind(&path.course_ids)
            .fetch_one(&pool)
            .await
        })
        .await
    }

    async fn update_learning_path(
        &self,
        id: Uuid,
        req: UpdateLearningPathRequest,
    ) -> AppResult<Option<LearningPath>> {
        let req = &req;
        self.run("update_learning_path", |pool| async move {
            sqlx::query_as::<_, LearningPath>(concat!(
                "UPDATE learning_paths \
                 SET title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     status = COALESCE($4, status), \
                     course_ids = COALESCE($5, course_ids), \
                     updated_at = NOW() \
                 WHERE id = $1 RETURNING ",
                path_columns!()
            ))
            .bind(id)
            .bind(req.title.as_deref().map(str::trim))
            .bind(req.description.as_deref())
            .bind(req.status)
            .bind(req.course_ids.as_deref())
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn delete_learning_path(&self, id: Uuid) -> AppResult<bool> {
        self.run("delete_learning_path", |pool| async move {
            sqlx::query("DELETE FROM learning_paths WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await
                .map(|res| res.rows_affected() > 0)
        })
        .await
    }

    async fn existing_course_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        self.run("existing_course_ids", |pool| async move {
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM courses WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&pool)
                .await
        })
        .await
    }

    // --- PLAYGROUNDS ---

    async fn list_playgrounds(&self, user_id: Uuid) -> AppResult<Vec<Playground>> {
        self.run("list_playgrounds", |pool| async move {
            sqlx::query_as::<_, Playground>(concat!(
                "SELECT ",
                playground_columns!(),
                " FROM playgrounds WHERE user_id = $1 ORDER BY updated_at DESC"
            ))
            .bind(user_id)
            .fetch_all(&pool)
            .await
        })
        .await
    }

    async fn get_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Playground>> {
        self.run("get_playground", |pool| async move {
            sqlx::query_as::<_, Playground>(concat!(
                "SELECT ",
                playground_columns!(),
                " FROM playgrounds WHERE id = $1 AND user_id = $2"
            ))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn create_playground(&self, playground: NewPlayground) -> AppResult<Playground> {
        let id = Uuid::new_v4();
        let playground = &playground;
        self.run("create_playground", |pool| async move {
            sqlx::query_as::<_, Playground>(concat!(
                "INSERT INTO playgrounds (id, user_id, module_id, title, language, source, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING ",
                playground_columns!()
            ))
            .bind(id)
            .bind(playground.user_id)
            .bind(playground.module_id)
            .bind(&playground.title)
            .bind(&playground.language)
            .bind(&playground.source)
            .fetch_one(&pool)
            .await
        })
        .await
    }

    async fn update_playground(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdatePlaygroundRequest,
    ) -> AppResult<Option<Playground>> {
        let req = &req;
        self.run("update_playground", |pool| async move {
            sqlx::query_as::<_, Playground>(concat!(
                "UPDATE playgrounds \
                 SET title = COALESCE($3, title), \
                     language = COALESCE($4, language), \
                     source = COALESCE($5, source), \
                     updated_at = NOW() \
                 WHERE id = $1 AND user_id = $2 RETURNING ",
                playground_columns!()
            ))
            .bind(id)
            .bind(user_id)
            .bind(req.title.as_deref().map(str::trim))
            .bind(req.language.as_deref().map(str::trim))
            .bind(req.source.as_deref())
            .fetch_optional(&pool)
            .await
        })
        .await
    }

    async fn delete_playground(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        self.run("delete_playground", |pool| async move {
            sqlx::query("DELETE FROM playgrounds WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&pool)
                .await
                .map(|res| res.rows_affected() > 0)
        })
        .await
    }

    // --- SEARCH & STATS ---

    /// search
    ///
    /// One UNION over published modules (title, description, body) and published
    /// courses (title, description). Title hits rank first, then alphabetical.
    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<SearchResult>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let pattern = pattern.as_str();

        self.run("search", |pool| async move {
            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "SELECT kind, id, title, slug, description, module_number FROM (\
                 SELECT 'module'::text AS kind, id, title, slug, description, \
                        module_number::text AS module_number, (title ILIKE ",
            );
            builder.push_bind(pattern);
            builder.push(") AS title_match FROM modules WHERE status = 'published' AND (title ILIKE ");
            builder.push_bind(pattern);
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(" OR content ILIKE ");
            builder.push_bind(pattern);
            builder.push(
                ") UNION ALL \
                 SELECT 'course'::text, id, title, slug, description, NULL::text, (title ILIKE ",
            );
            builder.push_bind(pattern);
            builder.push(") FROM courses WHERE status = 'published' AND (title ILIKE ");
            builder.push_bind(pattern);
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")) AS hits ORDER BY title_match DESC, title ASC LIMIT ");
            builder.push_bind(limit);

            builder.build_query_as::<SearchResult>().fetch_all(&pool).await
        })
        .await
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        self.run("get_stats", |pool| async move {
            sqlx::query_as::<_, AdminDashboardStats>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users) AS total_users,
                    (SELECT COUNT(*) FROM users WHERE role = 'faculty') AS total_faculty,
                    (SELECT COUNT(*) FROM modules) AS total_modules,
                    (SELECT COUNT(*) FROM modules WHERE status = 'published') AS published_modules,
                    (SELECT COUNT(*) FROM courses) AS total_courses,
                    (SELECT COUNT(*) FROM courses WHERE status = 'published') AS published_courses,
                    (SELECT COUNT(*) FROM course_tracking) AS total_enrollments,
                    (SELECT COUNT(*) FROM course_tracking WHERE status = 'completed') AS completed_enrollments
                "#,
            )
            .fetch_one(&pool)
            .await
        })
        .await
    }
}
