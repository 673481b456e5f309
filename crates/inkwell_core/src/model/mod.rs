//! Domain model for articles, their authors and tags.
//!
//! # Responsibility
//! - Define the persisted entities (`Article`, `User`, `Tag`, `ArticleTag`).
//! - Define response-only read models (`ArticleResponse`, `Profile`).
//!
//! # Invariants
//! - Every entity is identified by a store-assigned integer id.
//! - Response models are derived values and are never persisted.

pub mod article;
pub mod response;
pub mod tag;
pub mod user;
