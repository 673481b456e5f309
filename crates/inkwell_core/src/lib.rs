//! Article aggregation and mutation core for inkwell.
//!
//! Composes article read models from independently owned article, user and
//! tag stores, and runs multi-step article writes as atomic units of work.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, PageLimits};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::article::{slugify, Article, ArticleId, ArticleUpdate, NewArticle};
pub use model::response::{ArticleResponse, ArticlesResponse};
pub use model::tag::{ArticleTag, ArticleTagName, Tag, TagId};
pub use model::user::{NewUser, Profile, User, UserId};
pub use repo::article_store::{
    ArticleListQuery, ArticlePage, ArticleStore, FeedQuery, SqliteArticleStore,
};
pub use repo::tag_store::{SqliteTagStore, TagStore};
pub use repo::unit_of_work::{SqliteUnitOfWork, UnitOfWork};
pub use repo::user_store::{SqliteUserStore, UserStore};
pub use repo::{RepoError, RepoResult};
pub use service::article_service::{
    ArticleService, ArticleServiceError, ServiceResult, SqliteArticleService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
