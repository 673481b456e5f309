//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `inkwell_core` wiring against a
//!   real database.
//! - Keep output deterministic for quick local sanity checks.

use inkwell_core::db::migrations::current_version;
use inkwell_core::db::{open_db, open_db_in_memory};
use inkwell_core::{init_from_config, ArticleListQuery, CoreConfig, SqliteArticleService};
use log::info;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("inkwell error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    let file_logging = init_from_config(&config)?;

    let conn = match config.db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    info!(
        "event=cli_start module=cli status=ok file_logging={} in_memory={}",
        file_logging,
        config.db_path.is_none()
    );

    let service = SqliteArticleService::sqlite(&conn)?.with_page_limits(config.page);
    let page = service.list_articles(&ArticleListQuery::default())?;
    let tags = service.list_tags()?;

    println!("inkwell_core version={}", inkwell_core::core_version());
    println!("inkwell_core schema_version={}", current_version(&conn)?);
    println!("inkwell_core articles={}", page.articles_count);
    for article in &page.articles {
        println!("article slug={} favorites={}", article.slug, article.favorites_count);
    }
    println!("inkwell_core tags={}", tags.join(","));
    Ok(())
}
