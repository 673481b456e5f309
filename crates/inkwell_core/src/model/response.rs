//! Response-only article read models.
//!
//! # Responsibility
//! - Combine an article with its tags, author profile and favorite state.
//! - Render epoch-millisecond timestamps as ISO-8601 strings.
//!
//! # Invariants
//! - `favorites_count` is never negative.
//! - Serialized field names are camelCase (`tagList`, `favoritesCount`, ...).

use crate::model::article::Article;
use crate::model::user::Profile;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// One article aggregate as seen by a specific viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub favorited: bool,
    pub favorites_count: u64,
    pub author: Profile,
}

/// One page of article aggregates plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleResponse>,
    /// Total matching rows, independent of paging.
    pub articles_count: u64,
}

impl ArticleResponse {
    /// Assembles the aggregate from already-fetched parts.
    pub fn assemble(
        article: &Article,
        tag_list: Vec<String>,
        favorited: bool,
        favorites_count: u64,
        author: Profile,
    ) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            body: article.body.clone(),
            tag_list,
            created_at: format_timestamp(article.created_at),
            updated_at: format_timestamp(article.updated_at),
            favorited,
            favorites_count,
            author,
        }
    }
}

/// Formats epoch milliseconds as RFC 3339 UTC with millisecond precision.
///
/// Out-of-range values render as the unix epoch.
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
