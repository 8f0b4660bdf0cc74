use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::SearchResult,
};

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_QUERY_LEN: usize = 100;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 50;

/// SearchQuery
///
/// Query parameters for GET /api/search.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Search text, 2 to 100 characters after trimming.
    pub q: Option<String>,
    /// Maximum number of hits, 1 to 50. Defaults to 20.
    pub limit: Option<i64>,
}

impl SearchQuery {
    /// Returns the trimmed query and effective limit, or a 400.
    pub fn validate(&self) -> AppResult<(&str, i64)> {
        let q = self
            .q
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| AppError::validation("q is required"))?;
        let len = q.chars().count();
        if !(MIN_QUERY_LEN..=MAX_QUERY_LEN).contains(&len) {
            return Err(AppError::validation(format!(
                "q must be {} to {} characters",
                MIN_QUERY_LEN, MAX_QUERY_LEN
            )));
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok((q, limit))
    }
}

/// search
///
/// [Public Route] Case-insensitive search over published modules (title, description,
/// content) and published courses (title, description). Title matches rank first.
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Hits", body = [SearchResult]),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<SearchResult>>> {
    let (q, limit) = query.validate()?;
    Ok(Json(state.repo.search(q, limit).await?))
}
