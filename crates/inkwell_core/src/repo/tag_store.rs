//! Tag store contract and SQLite implementation.
//!
//! # Responsibility
//! - Look up and bulk-insert tag entities by name.
//! - Resolve tag names attached to one or many articles.
//!
//! # Invariants
//! - Tag names are unique; the store never creates two rows for one name.
//! - Per-article tag names are returned in link insertion order.

use crate::model::article::ArticleId;
use crate::model::tag::{ArticleTagName, Tag};
use crate::repo::{id_values, placeholders, RepoResult, MAX_BIND_PARAMS};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Persistence capability for tags and their article associations.
pub trait TagStore {
    /// Returns the stored tags whose names appear in `names`.
    fn find_tags_by_names(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>>;
    /// Inserts one tag per name in a single batch and returns them.
    fn insert_and_get(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>>;
    /// Lists tag names attached to one article.
    fn get_tags_by_article(
        &self,
        conn: &Connection,
        article_id: ArticleId,
    ) -> RepoResult<Vec<String>>;
    /// Lists `(article_id, name)` pairs for every article in `article_ids`.
    fn get_tags_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<Vec<ArticleTagName>>;
    /// Lists every tag name that is attached to at least one article.
    fn list_tags(&self, conn: &Connection) -> RepoResult<Vec<String>>;
}

/// SQLite-backed tag store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTagStore;

impl TagStore for SqliteTagStore {
    fn find_tags_by_names(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>> {
        let mut tags = Vec::new();
        for chunk in names.chunks(MAX_BIND_PARAMS) {
            let sql = format!(
                "SELECT id, name FROM tags WHERE name IN ({}) ORDER BY id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                tags.push(Tag {
                    id: row.get("id")?,
                    name: row.get("name")?,
                });
            }
        }
        Ok(tags)
    }

    fn insert_and_get(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        for chunk in names.chunks(MAX_BIND_PARAMS) {
            let rows = vec!["(?)"; chunk.len()].join(", ");
            conn.execute(
                &format!("INSERT INTO tags (name) VALUES {rows};"),
                params_from_iter(chunk.iter().map(|name| Value::Text(name.clone()))),
            )?;
        }
        self.find_tags_by_names(conn, names)
    }

    fn get_tags_by_article(
        &self,
        conn: &Connection,
        article_id: ArticleId,
    ) -> RepoResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT t.name
             FROM article_tags at
             INNER JOIN tags t ON t.id = at.tag_id
             WHERE at.article_id = ?1
             ORDER BY at.rowid ASC;",
        )?;
        let mut rows = stmt.query([article_id])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    fn get_tags_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<Vec<ArticleTagName>> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT at.article_id, t.name
             FROM article_tags at
             INNER JOIN tags t ON t.id = at.tag_id
             WHERE at.article_id IN ({})
             ORDER BY at.rowid ASC;",
            placeholders(article_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(id_values(article_ids)))?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(ArticleTagName {
                article_id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(links)
    }

    fn list_tags(&self, conn: &Connection) -> RepoResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT t.name
             FROM tags t
             WHERE EXISTS (SELECT 1 FROM article_tags at WHERE at.tag_id = t.id)
             ORDER BY t.name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}
