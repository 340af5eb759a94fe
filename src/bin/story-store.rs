//! Story store service: `POST /api/save` and `GET /api/stories`.
//!
//! The backing store comes from `STORY_STORE_DB`, then `server.database` in
//! `settings.toml`, then `stories.json` in the data directory.  Use `memory`
//! for a throwaway store.

use anyhow::Context;
use voice_reader::{
    config::{AppConfig, AppPaths},
    store::{self, repository, DATABASE_ENV},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load_or_init().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let connection = store::connection_string(
        std::env::var(DATABASE_ENV).ok(),
        config.server.database.as_deref(),
        &AppPaths::new().stories_file,
    );
    let repo = repository::open(&connection)
        .await
        .with_context(|| format!("failed to open story store {connection:?}"))?;
    log::info!("story store: using {connection}");

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("story store: listening on {addr}");

    axum::serve(listener, store::create_router(repo))
        .await
        .context("story store server failed")?;
    Ok(())
}
