//! Tag and article-tag junction models.

use crate::model::article::ArticleId;

/// Store-assigned tag identifier.
pub type TagId = i64;

/// Persisted tag. `name` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Junction row linking one article to one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleTag {
    pub article_id: ArticleId,
    pub tag_id: TagId,
}

/// Tag name attached to an article, as returned by batched tag lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTagName {
    pub article_id: ArticleId,
    pub name: String,
}
