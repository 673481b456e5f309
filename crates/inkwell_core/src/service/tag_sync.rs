//! Tag synchronization helpers.
//!
//! # Responsibility
//! - Normalize requested tag names (trim, reject blanks, dedupe).
//! - Map names to persisted tags, creating only the missing ones.
//! - Link the resulting tags to one article.
//!
//! # Invariants
//! - Existing names are looked up in one call and missing names inserted in
//!   one call, whatever the request size.
//! - Returned tags follow the order of the requested names.
//! - Concurrent creation of the same name is left to the store's unique
//!   constraint.

use crate::model::article::ArticleId;
use crate::model::tag::{ArticleTag, Tag};
use crate::repo::article_store::ArticleStore;
use crate::repo::tag_store::TagStore;
use crate::repo::RepoResult;
use crate::service::article_service::ArticleServiceError;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

/// Trims and deduplicates tag names, keeping first occurrences in order.
///
/// Returns `InvalidTag` for names that are blank after trimming.
pub fn normalize_tag_names(raw: &[String]) -> Result<Vec<String>, ArticleServiceError> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());
    for name in raw {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ArticleServiceError::InvalidTag(name.clone()));
        }
        if seen.insert(trimmed) {
            names.push(trimmed.to_string());
        }
    }
    Ok(names)
}

/// Returns requested names that are not among `existing`, without repeats.
pub fn extract_new_tags(requested: &[String], existing: &[Tag]) -> Vec<String> {
    let known: HashSet<&str> = existing.iter().map(|tag| tag.name.as_str()).collect();
    let mut emitted = HashSet::new();
    requested
        .iter()
        .filter(|name| !known.contains(name.as_str()))
        .filter(|name| emitted.insert(name.as_str()))
        .cloned()
        .collect()
}

/// Resolves `names` to persisted tags, inserting the missing ones.
pub fn create_tags<T: TagStore>(
    store: &T,
    conn: &Connection,
    names: &[String],
) -> RepoResult<Vec<Tag>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let existing = store.find_tags_by_names(conn, names)?;
    let missing = extract_new_tags(names, &existing);
    let inserted = store.insert_and_get(conn, &missing)?;

    let mut by_name: HashMap<String, Tag> = existing
        .into_iter()
        .chain(inserted)
        .map(|tag| (tag.name.clone(), tag))
        .collect();
    Ok(names.iter().filter_map(|name| by_name.remove(name)).collect())
}

/// Links every tag in `tags` to `article_id` in one batch.
pub fn connect_tag_article<A: ArticleStore>(
    store: &A,
    conn: &Connection,
    article_id: ArticleId,
    tags: &[Tag],
) -> RepoResult<()> {
    let links: Vec<ArticleTag> = tags
        .iter()
        .map(|tag| ArticleTag {
            article_id,
            tag_id: tag.id,
        })
        .collect();
    store.insert_article_tags(conn, &links)
}
