use std::collections::HashSet;

pub const MAX_SLUG_LEN: usize = 80;

/// slugify
///
/// Lowercases ASCII alphanumerics and collapses every other run of characters into a
/// single `-`. Titles with nothing usable become `untitled`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                if slug.len() + 2 > MAX_SLUG_LEN {
                    break;
                }
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Room kept for a `-N` suffix when a long slug collides.
const SUFFIX_ROOM: usize = 6;

/// suffix_stem
///
/// The part of `base` that numbered candidates are built on. Long bases are cut so
/// `stem-N` stays within `MAX_SLUG_LEN`.
pub fn suffix_stem(base: &str) -> &str {
    let cut = MAX_SLUG_LEN - SUFFIX_ROOM;
    match base.char_indices().nth(cut) {
        Some((end, _)) => base[..end].trim_end_matches('-'),
        None => base,
    }
}

/// next_available
///
/// Returns `base` if it is free, otherwise the first of `stem-2`, `stem-3`, … not in
/// `taken`, where the stem is `base` cut by [`suffix_stem`].
pub fn next_available(base: &str, taken: &[String]) -> String {
    let taken: HashSet<&str> = taken.iter().map(String::as_str).collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let stem = suffix_stem(base);
    (2u32..)
        .map(|n| format!("{}-{}", stem, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
