//! Article use-case service.
//!
//! # Responsibility
//! - Compose article aggregates from the article, user and tag stores.
//! - Run multi-step writes (create, update, delete, favorite toggles) as one
//!   atomic unit of work each.
//!
//! # Invariants
//! - Every public operation opens exactly one unit of work.
//! - Collection reads fetch authors and tags once per page, never per row.
//! - A slug that resolves to nothing yields `Ok(None)` and no further store
//!   calls are made for that operation.
//! - A missing author degrades to an empty profile in collections but turns
//!   a single-article lookup into `Ok(None)`.
//! - Favorite counts are always keyed by article id.

use crate::config::PageLimits;
use crate::model::article::{slugify, Article, ArticleId, ArticleUpdate, NewArticle};
use crate::model::response::{ArticleResponse, ArticlesResponse};
use crate::model::user::{Profile, UserId};
use crate::repo::article_store::{
    ArticleListQuery, ArticlePage, ArticleStore, FeedQuery, SqliteArticleStore,
};
use crate::repo::tag_store::{SqliteTagStore, TagStore};
use crate::repo::unit_of_work::{SqliteUnitOfWork, UnitOfWork};
use crate::repo::user_store::{SqliteUserStore, UserStore};
use crate::repo::{RepoError, RepoResult};
use crate::service::tag_sync::{connect_tag_article, create_tags, normalize_tag_names};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ServiceResult<T> = Result<T, ArticleServiceError>;

/// Service error for article use-cases.
#[derive(Debug)]
pub enum ArticleServiceError {
    /// Request payload is unusable (for example a title without letters).
    InvalidInput(&'static str),
    /// Tag name is blank after trimming.
    InvalidTag(String),
    /// Another article already owns the derived slug.
    SlugTaken(String),
    /// Persistence-layer failure; the unit of work was rolled back.
    Repo(RepoError),
}

impl Display for ArticleServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(details) => write!(f, "invalid article input: {details}"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::SlugTaken(slug) => write!(f, "article slug already taken: {slug}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ArticleServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ArticleServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SlugTaken(slug) => Self::SlugTaken(slug),
            other => Self::Repo(other),
        }
    }
}

/// Favorite data fetched for one page. Empty when not requested.
#[derive(Debug, Default)]
struct FavoriteSnapshot {
    favorited: HashSet<ArticleId>,
    counts: HashMap<ArticleId, u64>,
}

/// Article orchestration over pluggable stores and a unit-of-work runner.
pub struct ArticleService<W, A, U, T> {
    uow: W,
    articles: A,
    users: U,
    tags: T,
    limits: PageLimits,
}

/// Article service wired to the SQLite stores.
pub type SqliteArticleService<'conn> =
    ArticleService<SqliteUnitOfWork<'conn>, SqliteArticleStore, SqliteUserStore, SqliteTagStore>;

impl<'conn> SqliteArticleService<'conn> {
    /// Builds a service over a migrated connection.
    pub fn sqlite(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteUnitOfWork::try_new(conn)?,
            SqliteArticleStore,
            SqliteUserStore,
            SqliteTagStore,
        ))
    }
}

impl<W, A, U, T> ArticleService<W, A, U, T>
where
    W: UnitOfWork,
    A: ArticleStore,
    U: UserStore,
    T: TagStore,
{
    /// Creates a service from its collaborators with default page limits.
    pub fn new(uow: W, articles: A, users: U, tags: T) -> Self {
        Self {
            uow,
            articles,
            users,
            tags,
            limits: PageLimits::default(),
        }
    }

    /// Replaces the paging bounds used by listing and feeds.
    ///
    /// `PageLimits` can only hold validated bounds, so no check is needed
    /// here.
    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Lists one page of articles matching the query filters.
    ///
    /// Favorite flags and counts are only fetched when `query.viewer` is
    /// set; otherwise every row reports `false` / `0`.
    pub fn list_articles(&self, query: &ArticleListQuery) -> ServiceResult<ArticlesResponse> {
        let started_at = Instant::now();
        let query = ArticleListQuery {
            limit: Some(self.limits.normalize(query.limit)),
            ..query.clone()
        };

        let result = self.uow.run(|conn| -> ServiceResult<ArticlesResponse> {
            let page = self.articles.get_articles(conn, &query)?;
            self.compose_page(conn, page, query.viewer)
        });
        log_page("article_list", started_at, &result);
        result
    }

    /// Lists one page of articles written by users `follower_id` follows,
    /// with favorite state as seen by the follower.
    pub fn get_feed(
        &self,
        follower_id: UserId,
        limit: Option<u32>,
        offset: u32,
    ) -> ServiceResult<ArticlesResponse> {
        let started_at = Instant::now();
        let query = FeedQuery {
            limit: Some(self.limits.normalize(limit)),
            offset,
        };

        let result = self.uow.run(|conn| -> ServiceResult<ArticlesResponse> {
            let page = self
                .articles
                .get_articles_by_followees(conn, follower_id, query)?;
            self.compose_page(conn, page, Some(follower_id))
        });
        log_page("article_feed", started_at, &result);
        result
    }

    /// Gets one article aggregate as seen by `viewer`.
    pub fn get_article_by_slug(
        &self,
        slug: &str,
        viewer: Option<UserId>,
    ) -> ServiceResult<Option<ArticleResponse>> {
        let started_at = Instant::now();
        let result = self
            .uow
            .run(|conn| -> ServiceResult<Option<ArticleResponse>> {
                let Some(article) = self.articles.get_article_by_slug(conn, slug)? else {
                    return Ok(None);
                };
                Ok(self.compose_article(conn, &article, viewer)?)
            });
        log_single("article_get", slug, started_at, &result);
        result
    }

    /// Creates an article with its tags and returns its aggregate.
    ///
    /// Returns `Ok(None)` only when the author row vanished mid-transaction.
    pub fn create_article(
        &self,
        author_id: UserId,
        new_article: &NewArticle,
        viewer: Option<UserId>,
    ) -> ServiceResult<Option<ArticleResponse>> {
        let started_at = Instant::now();
        let slug = slugify(&new_article.title);
        if slug.is_empty() {
            return Err(ArticleServiceError::InvalidInput(
                "title must contain at least one letter or digit",
            ));
        }
        let tag_names = normalize_tag_names(&new_article.tag_names)?;

        let result = self
            .uow
            .run_in_transaction(|conn| -> ServiceResult<Option<ArticleResponse>> {
                let article = self
                    .articles
                    .create_article(conn, author_id, &slug, new_article)?;
                let tags = create_tags(&self.tags, conn, &tag_names)?;
                connect_tag_article(&self.articles, conn, article.id, &tags)?;
                Ok(self.compose_article(conn, &article, viewer)?)
            });
        log_single("article_create", &slug, started_at, &result);
        result
    }

    /// Applies a partial update to the article at `slug`.
    ///
    /// The slug follows the title when the title changes. When
    /// `update.tag_names` is set, the tag set is replaced as well. An empty
    /// update writes nothing and returns the current aggregate.
    pub fn update_article_by_slug(
        &self,
        slug: &str,
        acting_user: UserId,
        update: &ArticleUpdate,
    ) -> ServiceResult<Option<ArticleResponse>> {
        let started_at = Instant::now();
        let tag_names = update
            .tag_names
            .as_deref()
            .map(normalize_tag_names)
            .transpose()?;

        let result = self
            .uow
            .run_in_transaction(|conn| -> ServiceResult<Option<ArticleResponse>> {
                let Some(current) = self.articles.get_article_by_slug(conn, slug)? else {
                    return Ok(None);
                };
                if update.is_empty() {
                    return Ok(self.compose_article(conn, &current, Some(acting_user))?);
                }
                let merged = current.merged_with(update);
                if merged.slug.is_empty() {
                    return Err(ArticleServiceError::InvalidInput(
                        "title must contain at least one letter or digit",
                    ));
                }
                let Some(saved) = self.articles.update_article(conn, &merged)? else {
                    return Ok(None);
                };

                if let Some(names) = tag_names.as_deref() {
                    self.articles.delete_article_tags(conn, saved.id)?;
                    let tags = create_tags(&self.tags, conn, names)?;
                    connect_tag_article(&self.articles, conn, saved.id, &tags)?;
                }

                Ok(self.compose_article(conn, &saved, Some(acting_user))?)
            });
        log_single("article_update", slug, started_at, &result);
        result
    }

    /// Deletes the article at `slug` together with its tag links and
    /// favorite marks.
    ///
    /// Returns `Ok(false)` when no article had that slug; nothing is changed
    /// in that case.
    pub fn delete_article_by_slug(&self, slug: &str) -> ServiceResult<bool> {
        let started_at = Instant::now();
        let result = self.uow.run_in_transaction(|conn| -> ServiceResult<bool> {
            Ok(self.articles.delete_article_by_slug(conn, slug)?)
        });
        match &result {
            Ok(deleted) => info!(
                "event=article_delete module=service status=ok slug={} deleted={} duration_ms={}",
                slug,
                deleted,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=article_delete module=service status=error slug={} duration_ms={} error={}",
                slug,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Marks the article at `slug` as favorited by `user_id`.
    ///
    /// The count is read before the mark is written and reported as
    /// `stored + 1` when a new mark was inserted, instead of being re-read.
    pub fn favorite_article(
        &self,
        user_id: UserId,
        slug: &str,
    ) -> ServiceResult<Option<ArticleResponse>> {
        let started_at = Instant::now();
        let result = self
            .uow
            .run_in_transaction(|conn| -> ServiceResult<Option<ArticleResponse>> {
                let Some(article) = self.articles.get_article_by_slug(conn, slug)? else {
                    return Ok(None);
                };
                let stored = self.articles.count_favorites(conn, article.id)?;
                let inserted = self.articles.favorite_article(conn, user_id, article.id)?;
                let reported = if inserted { stored + 1 } else { stored };
                Ok(self.compose_with_favorite(conn, &article, true, reported)?)
            });
        log_single("article_favorite", slug, started_at, &result);
        result
    }

    /// Removes `user_id`'s favorite mark from the article at `slug`.
    pub fn unfavorite_article(
        &self,
        user_id: UserId,
        slug: &str,
    ) -> ServiceResult<Option<ArticleResponse>> {
        let started_at = Instant::now();
        let result = self
            .uow
            .run_in_transaction(|conn| -> ServiceResult<Option<ArticleResponse>> {
                let Some(article) = self.articles.get_article_by_slug(conn, slug)? else {
                    return Ok(None);
                };
                self.articles.unfavorite_article(conn, user_id, article.id)?;
                let stored = self.articles.count_favorites(conn, article.id)?;
                Ok(self.compose_with_favorite(conn, &article, false, stored)?)
            });
        log_single("article_unfavorite", slug, started_at, &result);
        result
    }

    /// Lists tag names in use by at least one article.
    pub fn list_tags(&self) -> ServiceResult<Vec<String>> {
        let started_at = Instant::now();
        let result = self
            .uow
            .run(|conn| -> ServiceResult<Vec<String>> { Ok(self.tags.list_tags(conn)?) });
        match &result {
            Ok(tags) => info!(
                "event=tag_list module=service status=ok rows={} duration_ms={}",
                tags.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=tag_list module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn compose_page(
        &self,
        conn: &Connection,
        page: ArticlePage,
        viewer: Option<UserId>,
    ) -> ServiceResult<ArticlesResponse> {
        let article_ids: Vec<ArticleId> = page.articles.iter().map(|a| a.id).collect();
        let author_ids: Vec<UserId> = page
            .articles
            .iter()
            .map(|a| a.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<UserId, Profile> = self
            .users
            .get_users_by_ids(conn, &author_ids)?
            .iter()
            .map(|user| (user.id, Profile::from(user)))
            .collect();

        let mut tags_by_article: HashMap<ArticleId, Vec<String>> = HashMap::new();
        for link in self.tags.get_tags_by_articles(conn, &article_ids)? {
            tags_by_article
                .entry(link.article_id)
                .or_default()
                .push(link.name);
        }

        let favorites = match viewer {
            Some(viewer) => FavoriteSnapshot {
                favorited: self
                    .articles
                    .favorite_article_ids(conn, viewer, &article_ids)?,
                counts: self
                    .articles
                    .count_favorites_by_articles(conn, &article_ids)?,
            },
            None => FavoriteSnapshot::default(),
        };

        let articles = page
            .articles
            .iter()
            .map(|article| {
                ArticleResponse::assemble(
                    article,
                    tags_by_article.remove(&article.id).unwrap_or_default(),
                    favorites.favorited.contains(&article.id),
                    favorites.counts.get(&article.id).copied().unwrap_or(0),
                    authors
                        .get(&article.author_id)
                        .cloned()
                        .unwrap_or_else(Profile::empty),
                )
            })
            .collect();

        Ok(ArticlesResponse {
            articles,
            articles_count: page.total,
        })
    }

    fn compose_article(
        &self,
        conn: &Connection,
        article: &Article,
        viewer: Option<UserId>,
    ) -> RepoResult<Option<ArticleResponse>> {
        let favorited = match viewer {
            Some(viewer) => self.articles.is_favorite_article(conn, viewer, article.id)?,
            None => false,
        };
        let count = self.articles.count_favorites(conn, article.id)?;
        self.compose_with_favorite(conn, article, favorited, count)
    }

    fn compose_with_favorite(
        &self,
        conn: &Connection,
        article: &Article,
        favorited: bool,
        favorites_count: u64,
    ) -> RepoResult<Option<ArticleResponse>> {
        let Some(author) = self.users.get_user(conn, article.author_id)? else {
            warn!(
                "event=article_compose module=service status=missing_author article_id={} author_id={}",
                article.id, article.author_id
            );
            return Ok(None);
        };
        let tags = self.tags.get_tags_by_article(conn, article.id)?;
        Ok(Some(ArticleResponse::assemble(
            article,
            tags,
            favorited,
            favorites_count,
            Profile::from(&author),
        )))
    }
}

fn log_page(event: &'static str, started_at: Instant, result: &ServiceResult<ArticlesResponse>) {
    match result {
        Ok(page) => info!(
            "event={} module=service status=ok rows={} total={} duration_ms={}",
            event,
            page.articles.len(),
            page.articles_count,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={} module=service status=error duration_ms={} error={}",
            event,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}

fn log_single(
    event: &'static str,
    slug: &str,
    started_at: Instant,
    result: &ServiceResult<Option<ArticleResponse>>,
) {
    let elapsed = started_at.elapsed().as_millis();
    match result {
        Ok(Some(_)) => info!("event={event} module=service status=ok slug={slug} duration_ms={elapsed}"),
        Ok(None) => info!(
            "event={event} module=service status=not_found slug={slug} duration_ms={elapsed}"
        ),
        Err(err) => warn!(
            "event={event} module=service status=error slug={slug} duration_ms={elapsed} error={err}"
        ),
    }
}
