//! Article domain model.
//!
//! # Responsibility
//! - Define the persisted article row and its create/update inputs.
//! - Derive URL-safe slugs from titles.
//! - Merge partial updates onto an existing article.
//!
//! # Invariants
//! - `slug` is a pure function of `title` (see [`slugify`]).
//! - A merged article only gets a new slug when its title actually changed.

use crate::model::user::UserId;
use once_cell::sync::Lazy;
use regex::Regex;

/// Store-assigned article identifier.
pub type ArticleId = i64;

static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug separator regex"));

/// Persisted article row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    /// Unique, derived from `title`.
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    /// Owning user. Not owned by the article store.
    pub author_id: UserId,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Input for creating one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub body: String,
    /// Raw tag names; may contain duplicates and surrounding whitespace.
    pub tag_names: Vec<String>,
}

/// Partial article update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    /// When set, replaces the whole tag set of the article.
    pub tag_names: Option<Vec<String>>,
}

impl ArticleUpdate {
    /// Returns whether the update carries no field changes at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.body.is_none()
            && self.tag_names.is_none()
    }
}

impl Article {
    /// Returns a new article value with `update` applied on top of `self`.
    ///
    /// The slug is recomputed only when a title is supplied and it differs
    /// from the current one; timestamps are left for the store to refresh.
    pub fn merged_with(&self, update: &ArticleUpdate) -> Article {
        let (title, slug) = match update.title.as_deref() {
            Some(title) if title != self.title => (title.to_string(), slugify(title)),
            _ => (self.title.clone(), self.slug.clone()),
        };

        Article {
            id: self.id,
            slug,
            title,
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            body: update.body.clone().unwrap_or_else(|| self.body.clone()),
            author_id: self.author_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Derives a URL-safe slug from an article title.
///
/// Letters and digits are kept (lowercased); every other run of characters
/// becomes one `-`, and leading/trailing separators are dropped.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    SLUG_SEPARATOR_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
