#![allow(dead_code)]

use inkwell_core::{
    Article, ArticleId, ArticleListQuery, ArticlePage, ArticleService, ArticleStore, ArticleTag,
    ArticleTagName, FeedQuery, NewArticle, NewUser, RepoError, RepoResult, SqliteArticleStore,
    SqliteTagStore, SqliteUnitOfWork, SqliteUserStore, Tag, TagStore, User, UserId, UserStore,
};
use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Ordered log of store method names invoked through [`Recording`].
#[derive(Debug, Default)]
pub struct CallLog {
    calls: RefCell<Vec<&'static str>>,
}

impl CallLog {
    pub fn record(&self, name: &'static str) {
        self.calls.borrow_mut().push(name);
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|call| **call == name).count()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

/// Store wrapper that records every call before delegating.
pub struct Recording<S> {
    pub inner: S,
    pub log: Rc<CallLog>,
}

impl<S> Recording<S> {
    pub fn new(inner: S, log: &Rc<CallLog>) -> Self {
        Self {
            inner,
            log: Rc::clone(log),
        }
    }
}

impl<S: UserStore> UserStore for Recording<S> {
    fn get_user(&self, conn: &Connection, user_id: UserId) -> RepoResult<Option<User>> {
        self.log.record("get_user");
        self.inner.get_user(conn, user_id)
    }

    fn get_users_by_ids(&self, conn: &Connection, user_ids: &[UserId]) -> RepoResult<Vec<User>> {
        self.log.record("get_users_by_ids");
        self.inner.get_users_by_ids(conn, user_ids)
    }
}

impl<S: TagStore> TagStore for Recording<S> {
    fn find_tags_by_names(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>> {
        self.log.record("find_tags_by_names");
        self.inner.find_tags_by_names(conn, names)
    }

    fn insert_and_get(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>> {
        self.log.record("insert_and_get");
        self.inner.insert_and_get(conn, names)
    }

    fn get_tags_by_article(
        &self,
        conn: &Connection,
        article_id: ArticleId,
    ) -> RepoResult<Vec<String>> {
        self.log.record("get_tags_by_article");
        self.inner.get_tags_by_article(conn, article_id)
    }

    fn get_tags_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<Vec<ArticleTagName>> {
        self.log.record("get_tags_by_articles");
        self.inner.get_tags_by_articles(conn, article_ids)
    }

    fn list_tags(&self, conn: &Connection) -> RepoResult<Vec<String>> {
        self.log.record("list_tags");
        self.inner.list_tags(conn)
    }
}

impl<S: ArticleStore> ArticleStore for Recording<S> {
    fn get_articles(
        &self,
        conn: &Connection,
        query: &ArticleListQuery,
    ) -> RepoResult<ArticlePage> {
        self.log.record("get_articles");
        self.inner.get_articles(conn, query)
    }

    fn get_articles_by_followees(
        &self,
        conn: &Connection,
        follower_id: UserId,
        query: FeedQuery,
    ) -> RepoResult<ArticlePage> {
        self.log.record("get_articles_by_followees");
        self.inner.get_articles_by_followees(conn, follower_id, query)
    }

    fn get_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<Option<Article>> {
        self.log.record("get_article_by_slug");
        self.inner.get_article_by_slug(conn, slug)
    }

    fn create_article(
        &self,
        conn: &Connection,
        author_id: UserId,
        slug: &str,
        article: &NewArticle,
    ) -> RepoResult<Article> {
        self.log.record("create_article");
        self.inner.create_article(conn, author_id, slug, article)
    }

    fn update_article(&self, conn: &Connection, article: &Article) -> RepoResult<Option<Article>> {
        self.log.record("update_article");
        self.inner.update_article(conn, article)
    }

    fn delete_article_by_slug(&self, conn: &Connection, slug: &str) -> RepoResult<bool> {
        self.log.record("delete_article_by_slug");
        self.inner.delete_article_by_slug(conn, slug)
    }

    fn insert_article_tags(&self, conn: &Connection, links: &[ArticleTag]) -> RepoResult<()> {
        self.log.record("insert_article_tags");
        self.inner.insert_article_tags(conn, links)
    }

    fn delete_article_tags(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<()> {
        self.log.record("delete_article_tags");
        self.inner.delete_article_tags(conn, article_id)
    }

    fn favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        self.log.record("favorite_article");
        self.inner.favorite_article(conn, user_id, article_id)
    }

    fn unfavorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        self.log.record("unfavorite_article");
        self.inner.unfavorite_article(conn, user_id, article_id)
    }

    fn is_favorite_article(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_id: ArticleId,
    ) -> RepoResult<bool> {
        self.log.record("is_favorite_article");
        self.inner.is_favorite_article(conn, user_id, article_id)
    }

    fn favorite_article_ids(
        &self,
        conn: &Connection,
        user_id: UserId,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashSet<ArticleId>> {
        self.log.record("favorite_article_ids");
        self.inner.favorite_article_ids(conn, user_id, article_ids)
    }

    fn count_favorites(&self, conn: &Connection, article_id: ArticleId) -> RepoResult<u64> {
        self.log.record("count_favorites");
        self.inner.count_favorites(conn, article_id)
    }

    fn count_favorites_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<HashMap<ArticleId, u64>> {
        self.log.record("count_favorites_by_articles");
        self.inner.count_favorites_by_articles(conn, article_ids)
    }
}

/// Tag store whose bulk insert always fails after delegating lookups.
pub struct FailingInsertTagStore;

impl TagStore for FailingInsertTagStore {
    fn find_tags_by_names(&self, conn: &Connection, names: &[String]) -> RepoResult<Vec<Tag>> {
        SqliteTagStore.find_tags_by_names(conn, names)
    }

    fn insert_and_get(&self, _conn: &Connection, _names: &[String]) -> RepoResult<Vec<Tag>> {
        Err(RepoError::InvalidData("tag insert rejected".to_string()))
    }

    fn get_tags_by_article(
        &self,
        conn: &Connection,
        article_id: ArticleId,
    ) -> RepoResult<Vec<String>> {
        SqliteTagStore.get_tags_by_article(conn, article_id)
    }

    fn get_tags_by_articles(
        &self,
        conn: &Connection,
        article_ids: &[ArticleId],
    ) -> RepoResult<Vec<ArticleTagName>> {
        SqliteTagStore.get_tags_by_articles(conn, article_ids)
    }

    fn list_tags(&self, conn: &Connection) -> RepoResult<Vec<String>> {
        SqliteTagStore.list_tags(conn)
    }
}

pub type RecordingService<'conn> = ArticleService<
    SqliteUnitOfWork<'conn>,
    Recording<SqliteArticleStore>,
    Recording<SqliteUserStore>,
    Recording<SqliteTagStore>,
>;

/// Builds a SQLite-backed service whose store calls land in `log`.
pub fn recording_service<'conn>(conn: &'conn Connection, log: &Rc<CallLog>) -> RecordingService<'conn> {
    ArticleService::new(
        SqliteUnitOfWork::try_new(conn).unwrap(),
        Recording::new(SqliteArticleStore, log),
        Recording::new(SqliteUserStore, log),
        Recording::new(SqliteTagStore, log),
    )
}

pub fn seed_user(conn: &Connection, username: &str) -> User {
    SqliteUserStore
        .create_user(conn, &NewUser::named(username))
        .unwrap()
}

pub fn seed_user_with_id(conn: &Connection, id: UserId, username: &str) -> User {
    conn.execute(
        "INSERT INTO users (id, username) VALUES (?1, ?2);",
        params![id, username],
    )
    .unwrap();
    SqliteUserStore.get_user(conn, id).unwrap().unwrap()
}

pub fn follow(conn: &Connection, follower: UserId, followee: UserId) {
    SqliteUserStore.follow_user(conn, follower, followee).unwrap();
}

pub fn new_article(title: &str, tags: &[&str]) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        description: format!("about {title}"),
        body: format!("body of {title}"),
        tag_names: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

pub fn persisted_favorites(conn: &Connection, slug: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*)
         FROM favorites f
         INNER JOIN articles a ON a.id = f.article_id
         WHERE a.slug = ?1;",
        [slug],
        |row| row.get(0),
    )
    .unwrap()
}
