//! HTTP handlers, grouped by resource.
//!
//! Every handler returns `AppResult`, so repository and validation failures propagate
//! with `?` and `AppError` decides the status code. Role checks happen inside the
//! handlers through the `AuthUser` helpers; the router only guarantees authentication.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    error::AppResult,
    repository::{RepositoryState, SlugScope},
    slug,
};

pub mod admin;
pub mod courses;
pub mod learning_paths;
pub mod modules;
pub mod playgrounds;
pub mod progress;
pub mod search;
pub mod session;
pub mod uploads;

/// unique_slug
///
/// Slugifies `title` and suffixes it until it no longer collides within `scope`.
pub(crate) async fn unique_slug(
    repo: &RepositoryState,
    scope: SlugScope,
    title: &str,
) -> AppResult<String> {
    let base = slug::slugify(title);
    let stem = slug::suffix_stem(&base);
    let mut taken = repo.taken_slugs(scope, stem).await?;
    if stem != base {
        taken.extend(repo.taken_slugs(scope, &base).await?);
    }
    Ok(slug::next_available(&base, &taken))
}

/// Drops repeated ids, keeping each at its first position.
pub(crate) fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
