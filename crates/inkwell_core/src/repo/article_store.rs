//! Article store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist articles, article-tag junction rows and favorite marks.
//! - Answer paged article queries and batched favorite aggregates.
//!
//! # Invariants
//! - Listing order is `created_at DESC, id DESC`.
//! - Page totals count every matching row, ignoring `limit`/`offset`.
//! - Unique-constraint failures on `articles.slug` surface as
//!   `RepoError::SlugTaken`.

use crate::model::article::{Article, ArticleId, NewArticle};
use crate::model::tag::ArticleTag;
use crate::model::user::UserId;
use crate::repo::{id_values, placeholders, to_count, RepoError, RepoResult, MAX_BIND_PARAMS};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};

const ARTICLE_COLUMNS: &str = "a.id AS id,
    a.slug AS slug,
    a.title AS title,
    a.description AS description,
    a.body AS body,
    a.author_id AS author_id,
    a.created_at AS created_at,
    a.updated_at AS updated_at";

/// Filter and paging options for article listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleListQuery {
    /// Exact tag name match.
    pub tag: Option<String>,
    /// Author username.
    pub author: Option<String>,
    /// Username of a user who favorited the article.
    pub favorited_by: Option<String>,
    /// Viewer whose favorite flags should be reported. Not a filter.
    pub viewer: Option<UserId>,
    /// Maximum rows to return. `None` means unbounded at the store level.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Paging options for a follower's feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// One page of articles plus the total number of matching rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total: u64,
}

/// Persistence capability for articles, their tag links and favorites.
///
/// Every method takes the connection (or transaction) of the enclosing unit
/// of work as its first argument.
pub trait ArticleStore {
    /// Lists one page of articles matching the query filters.
    fn get_articles(&self, conn: &Connection, query: &ArticleListQuery)
        -> RepoResult<ArticlePage>;
    /// Lists one page of articles written by users `follower_id` follows.
    fn get_articles_by_followees(
        &self,
        conn: &Connection,
        follower_id: UserId,
        query: FeedQuery,
    ) -> RepoResult<ArticlePage>;
    /// Gets one article by slug.
    fn get_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<Option<Article>>;
    /// Inserts one article row and returns it as persisted.
    fn create_article(
        &self,
        conn: &Connection,
        author_id: UserId,
        slug: &str,
        article: &NewArticle,
    ) -> RepoResult<Article>;
    /// Persists slug/title/description/body of `article` and returns the
    /// refreshed row, or `None` when the id no longer exists.
    fn update_article(&self, conn: &Connection, article: &Article) -> RepoResult<Option<Article>>;
    /// Deletes one article and its owned rows. Returns whether a row existed.
    fn delete_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<bool>;
    /// Inserts article-tag junction rows in one batch.
    fn insert_article_tags(&self, conn: &Connection, links: &[ArticleTag]) -> RepoResult<()>;
    /// Removes every junction row of one article.
    fn delete_article_tags(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<()>;
    /// Marks `article_id` as favorited by `user_id`. Returns whether a new
    /// mark was written.
    fn favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool>;
    /// Removes the favorite mark. Returns whether a mark existed.
    fn unfavorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool>;
    /// Returns whether `user_id` favorited `article_id`.
    fn is_favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool>;
    /// Returns the subset of `article_ids` favorited by `user_id`.
    fn favorite_article_ids(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashSet<ArticleId>>;
    /// Counts favorite marks of one article.
    fn count_favorites(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<u64>;
    /// Counts favorite marks per article. Articles without marks are absent.
    fn count_favorites_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashMap<ArticleId, u64>>;
}

/// SQLite-backed article store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteArticleStore;

impl ArticleStore for SqliteArticleStore {
    fn get_articles(
        &self,
        conn: &Connection,
        query: &ArticleListQuery,
    ) -> RepoResult<ArticlePage> {
        let mut filter = String::from(" WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_ref() {
            filter.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM article_tags at
                    INNER JOIN tags t ON t.id = at.tag_id
                    WHERE at.article_id = a.id
                      AND t.name = ?
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        if let Some(author) = query.author.as_ref() {
            filter.push_str(" AND a.author_id IN (SELECT id FROM users WHERE username = ?)");
            bind_values.push(Value::Text(author.clone()));
        }

        if let Some(favorited_by) = query.favorited_by.as_ref() {
            filter.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM favorites f
                    INNER JOIN users u ON u.id = f.user_id
                    WHERE f.article_id = a.id
                      AND u.username = ?
                )",
            );
            bind_values.push(Value::Text(favorited_by.clone()));
        }

        load_page(conn, &filter, bind_values, query.limit, query.offset)
    }

    fn get_articles_by_followees(
        &self,
        conn: &Connection,
        follower_id: UserId,
        query: FeedQuery,
    ) -> RepoResult<ArticlePage> {
        let filter = " WHERE a.author_id IN (
                SELECT followee_id FROM follows WHERE follower_id = ?
            )";
        load_page(
            conn,
            filter,
            vec![Value::Integer(follower_id)],
            query.limit,
            query.offset,
        )
    }

    fn get_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<Option<Article>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.slug = ?1;"
        ))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }
        Ok(None)
    }

    fn create_article(
        &self,
        conn: &Connection,
        author_id: UserId,
        slug: &str,
        article: &NewArticle,
    ) -> RepoResult<Article> {
        conn.execute(
            "INSERT INTO articles (slug, title, description, body, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                slug,
                article.title.as_str(),
                article.description.as_str(),
                article.body.as_str(),
                author_id,
            ],
        )
        .map_err(|err| map_slug_conflict(err, slug))?;

        let id = conn.last_insert_rowid();
        load_article_by_id(conn, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("article {id} missing right after insert"))
        })
    }

    fn update_article(&self, conn: &Connection, article: &Article) -> RepoResult<Option<Article>> {
        let changed = conn
            .execute(
                "UPDATE articles
                 SET
                    slug = ?2,
                    title = ?3,
                    description = ?4,
                    body = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    article.id,
                    article.slug.as_str(),
                    article.title.as_str(),
                    article.description.as_str(),
                    article.body.as_str(),
                ],
            )
            .map_err(|err| map_slug_conflict(err, &article.slug))?;

        if changed == 0 {
            return Ok(None);
        }
        load_article_by_id(conn, article.id)
    }

    fn delete_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<bool> {
        let changed = conn.execute("DELETE FROM articles WHERE slug = ?1;", [slug])?;
        Ok(changed > 0)
    }

    fn insert_article_tags(&self, conn: &Connection, links: &[ArticleTag]) -> RepoResult<()> {
        if links.is_empty() {
            return Ok(());
        }

        // Two bound parameters per link.
        for chunk in links.chunks(MAX_BIND_PARAMS / 2) {
            let rows = vec!["(?, ?)"; chunk.len()].join(", ");
            let bind_values = chunk
                .iter()
                .flat_map(|link| [Value::Integer(link.article_id), Value::Integer(link.tag_id)]);
            conn.execute(
                &format!("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES {rows};"),
                params_from_iter(bind_values),
            )?;
        }
        Ok(())
    }

    fn delete_article_tags(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<()> {
        conn.execute(
            "DELETE FROM article_tags WHERE article_id = ?1;",
            [article_id],
        )?;
        Ok(())
    }

    fn favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO favorites (user_id, article_id) VALUES (?1, ?2);",
            params![user_id, article_id],
        )?;
        Ok(changed > 0)
    }

    fn unfavorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        let changed = conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND article_id = ?2;",
            params![user_id, article_id],
        )?;
        Ok(changed > 0)
    }

    fn is_favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM favorites WHERE user_id = ?1 AND article_id = ?2
            );",
            params![user_id, article_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn favorite_article_ids(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashSet<ArticleId>> {
        if article_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT article_id
             FROM favorites
             WHERE user_id = ?
               AND article_id IN ({});",
            placeholders(article_ids.len())
        );
        let mut bind_values = vec![Value::Integer(user_id)];
        bind_values.extend(id_values(article_ids));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut favorited = HashSet::new();
        while let Some(row) = rows.next()? {
            favorited.insert(row.get::<_, ArticleId>(0)?);
        }
        Ok(favorited)
    }

    fn count_favorites(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<u64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE article_id = ?1;",
            [article_id],
            |row| row.get(0),
        )?;
        to_count(count, "favorites")
    }

    fn count_favorites_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashMap<ArticleId, u64>> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT article_id, COUNT(*)
             FROM favorites
             WHERE article_id IN ({})
             GROUP BY article_id;",
            placeholders(article_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(id_values(article_ids)))?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let article_id: ArticleId = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(article_id, to_count(count, "favorites")?);
        }
        Ok(counts)
    }
}

fn load_page(
    conn: &Connection,
    filter: &str,
    mut bind_values: Vec<Value>,
    limit: Option<u32>,
    offset: u32,
) -> RepoResult<ArticlePage> {
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM articles a{filter};"),
        params_from_iter(bind_values.iter()),
        |row| row.get(0),
    )?;

    let mut sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles a{filter} ORDER BY a.created_at DESC, a.id DESC"
    );
    // SQLite treats a negative LIMIT as unbounded.
    sql.push_str(" LIMIT ? OFFSET ?");
    bind_values.push(Value::Integer(limit.map_or(-1, i64::from)));
    bind_values.push(Value::Integer(i64::from(offset)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut articles = Vec::new();
    while let Some(row) = rows.next()? {
        articles.push(parse_article_row(row)?);
    }

    Ok(ArticlePage {
        articles,
        total: to_count(total, "articles")?,
    })
}

fn load_article_by_id(conn: &Connection, id: ArticleId) -> RepoResult<Option<Article>> {
    let article = conn
        .query_row(
            &format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.id = ?1;"),
            [id],
            |row| Ok(parse_article_row(row)),
        )
        .optional()?;
    article.transpose()
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let slug: String = row.get("slug")?;
    if slug.is_empty() {
        return Err(RepoError::InvalidData(
            "empty slug in articles.slug".to_string(),
        ));
    }

    Ok(Article {
        id: row.get("id")?,
        slug,
        title: row.get("title")?,
        description: row.get("description")?,
        body: row.get("body")?,
        author_id: row.get("author_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_slug_conflict(err: rusqlite::Error, slug: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::SlugTaken(slug.to_string())
        }
        _ => err.into(),
    }
}
