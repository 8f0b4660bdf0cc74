use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::unique_slug;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        ContentStatus, CreateModuleRequest, Module, ModuleDetail, ModuleTree, MoveModuleRequest,
        NewModule, ReorderModulesRequest, UpdateModuleRequest,
    },
    repository::{RepositoryState, SlugScope},
    tree::{self, ModuleNode},
};

/// TreeQuery
///
/// Query parameters for the public table of contents (GET /api/modules/tree).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct TreeQuery {
    /// The author whose published forest is returned.
    pub author_id: Uuid,
}

/// persist_layout
///
/// Renumbers `planned` and writes only the rows that differ from `before`.
async fn persist_layout(
    repo: &RepositoryState,
    before: &[ModuleNode],
    planned: &[ModuleNode],
) -> AppResult<()> {
    let changed = tree::changed_layouts(before, tree::renumber(planned));
    if changed.is_empty() {
        return Ok(());
    }
    tracing::debug!("rewriting layout of {} modules", changed.len());
    repo.apply_module_layout(&changed).await
}

async fn load_owned(repo: &RepositoryState, auth: &AuthUser, id: Uuid) -> AppResult<Module> {
    let module = repo.get_module(id).await?.ok_or(AppError::NotFound("Module"))?;
    auth.require_owner(module.author_id)?;
    Ok(module)
}

async fn reload(repo: &RepositoryState, id: Uuid) -> AppResult<Module> {
    repo.get_module(id).await?.ok_or(AppError::NotFound("Module"))
}

/// get_module
///
/// [Public Route] A published module and its published direct children, in order.
/// Drafts answer 404 so their existence is not leaked.
#[utoipa::path(
    get,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Found", body = ModuleDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_module(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ModuleDetail>> {
    let module = state
        .repo
        .get_module(id)
        .await?
        .filter(|m| m.status == ContentStatus::Published)
        .ok_or(AppError::NotFound("Module"))?;

    let mut children: Vec<Module> = state
        .repo
        .list_published_modules(Some(module.author_id))
        .await?
        .into_iter()
        .filter(|m| m.parent_module_id == Some(id))
        .collect();
    children.sort_by_key(|m| m.sort_order);

    Ok(Json(ModuleDetail { module, children }))
}

/// get_module_tree
///
/// [Public Route] The published module forest of one author, nested for a table of contents.
#[utoipa::path(
    get,
    path = "/api/modules/tree",
    params(TreeQuery),
    responses((status = 200, description = "Forest", body = [ModuleTree]))
)]
pub async fn get_module_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> AppResult<Json<Vec<ModuleTree>>> {
    let modules = state.repo.list_published_modules(Some(query.author_id)).await?;
    Ok(Json(tree::build_forest(&modules)))
}

/// list_my_modules
///
/// [Faculty Route] Every module the caller authored, drafts included, in outline order.
#[utoipa::path(
    get,
    path = "/api/modules/mine",
    responses(
        (status = 200, description = "My Modules", body = [Module]),
        (status = 403, description = "Not Faculty")
    )
)]
pub async fn list_my_modules(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Module>>> {
    auth.require_author()?;
    Ok(Json(state.repo.list_modules_by_author(auth.id).await?))
}

/// create_module
///
/// [Faculty Route] Creates a module, appended after the existing children of its parent
/// (or after the caller's root modules). The slug is derived from the title and
/// suffixed on collision.
#[utoipa::path(
    post,
    path = "/api/modules",
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Created", body = Module),
        (status = 400, description = "Invalid"),
        (status = 403, description = "Not Faculty"),
        (status = 404, description = "Parent Not Found")
    )
)]
pub async fn create_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateModuleRequest>,
) -> AppResult<(StatusCode, Json<Module>)> {
    auth.require_author()?;
    payload.validate()?;

    if let Some(parent_id) = payload.parent_module_id {
        let parent = state
            .repo
            .get_module(parent_id)
            .await?
            .ok_or(AppError::NotFound("Parent module"))?;
        // Trees are per author, so a parent must come from the caller's own forest.
        if parent.author_id != auth.id {
            return Err(AppError::validation(
                "parent module belongs to another author",
            ));
        }
    }

    let nodes = state.repo.get_module_nodes(auth.id).await?;
    let sort_order = nodes
        .iter()
        .filter(|n| n.parent_id == payload.parent_module_id)
        .count() as i32;

    let title = payload.title.trim().to_string();
    let slug = unique_slug(&state.repo, SlugScope::Module, &title).await?;
    let id = Uuid::new_v4();

    let mut planned = nodes.clone();
    planned.push(ModuleNode {
        id,
        parent_id: payload.parent_module_id,
        sort_order,
        module_number: String::new(),
        title: title.clone(),
    });
    let layout = tree::changed_layouts(&nodes, tree::renumber(&planned));

    let created = state
        .repo
        .create_module(
            NewModule {
                id,
                author_id: auth.id,
                parent_module_id: payload.parent_module_id,
                title,
                slug,
                description: payload.description.unwrap_or_default(),
                content: payload.content.unwrap_or_default(),
                status: payload.status.unwrap_or_default(),
                sort_order,
            },
            &layout,
        )
        .await?;

    tracing::info!("module {} created by {}", created.id, auth.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// update_module
///
/// [Faculty Route] Partial update of title, description, content or status.
/// Owner or admin only. Position is changed through the move and reorder routes.
#[utoipa::path(
    put,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleRequest,
    responses(
        (status = 200, description = "Updated", body = Module),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateModuleRequest>,
) -> AppResult<Json<Module>> {
    auth.require_author()?;
    payload.validate()?;
    load_owned(&state.repo, &auth, id).await?;

    let updated = state
        .repo
        .update_module(id, payload)
        .await?
        .ok_or(AppError::NotFound("Module"))?;
    Ok(Json(updated))
}

/// delete_module
///
/// [Faculty Route] Deletes a module together with its whole subtree, closes the gap among
/// the remaining siblings and recomputes enrolments in courses that contained it.
#[utoipa::path(
    delete,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_author()?;
    let module = load_owned(&state.repo, &auth, id).await?;

    let nodes = state.repo.get_module_nodes(module.author_id).await?;
    let mut doomed = tree::descendants(&nodes, id);
    doomed.push(id);

    let remaining: Vec<ModuleNode> = nodes
        .iter()
        .filter(|n| !doomed.contains(&n.id))
        .cloned()
        .collect();
    let layout = tree::changed_layouts(&remaining, tree::renumber(&remaining));

    let removed = state.repo.delete_modules(&doomed, &layout).await?;
    tracing::info!("module {} deleted with {} rows", id, removed);

    Ok(StatusCode::NO_CONTENT)
}

/// move_module
///
/// [Faculty Route] Re-parents a module within its author's forest. Moving a module under
/// itself or one of its descendants is rejected with 400.
#[utoipa::path(
    put,
    path = "/api/modules/{id}/move",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = MoveModuleRequest,
    responses(
        (status = 200, description = "Moved", body = Module),
        (status = 400, description = "Cycle"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn move_module(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveModuleRequest>,
) -> AppResult<Json<Module>> {
    auth.require_author()?;
    let module = load_owned(&state.repo, &auth, id).await?;

    let nodes = state.repo.get_module_nodes(module.author_id).await?;
    let planned = tree::move_node(
        &nodes,
        id,
        payload.parent_module_id,
        payload.position.map(|p| p as usize),
    )?;
    persist_layout(&state.repo, &nodes, &planned).await?;

    Ok(Json(reload(&state.repo, id).await?))
}

/// reorder_modules
///
/// [Faculty Route] Sets the order of one sibling group. `ordered_ids` must list every
/// current child exactly once. Returns the author's modules in their new outline order.
#[utoipa::path(
    put,
    path = "/api/modules/reorder",
    request_body = ReorderModulesRequest,
    responses(
        (status = 200, description = "Reordered", body = [Module]),
        (status = 400, description = "Mismatched ids"),
        (status = 404, description = "Parent Not Found")
    )
)]
pub async fn reorder_modules(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ReorderModulesRequest>,
) -> AppResult<Json<Vec<Module>>> {
    auth.require_author()?;

    let author_id = match payload.parent_module_id {
        Some(parent_id) => load_owned(&state.repo, &auth, parent_id).await?.author_id,
        None => auth.id,
    };

    let nodes = state.repo.get_module_nodes(author_id).await?;
    let planned = tree::reorder(&nodes, payload.parent_module_id, &payload.ordered_ids)?;
    persist_layout(&state.repo, &nodes, &planned).await?;

    Ok(Json(state.repo.list_modules_by_author(author_id).await?))
}
