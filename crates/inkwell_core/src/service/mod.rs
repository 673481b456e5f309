//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into article use-case APIs.
//! - Keep callers decoupled from storage details.

pub mod article_service;
pub mod tag_sync;
