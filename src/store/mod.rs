//! Story store: the client the pipeline saves through, and the small HTTP
//! service that persists stories.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_reader::config::AppConfig;
//! use voice_reader::store::{HttpStoryClient, NewStory, StoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = HttpStoryClient::from_config(&config.store);
//!
//!     client.save(&NewStory::new("My Story", "Once upon a time")).await.unwrap();
//!     for story in client.list().await.unwrap() {
//!         println!("{} — {}", story.date, story.title);
//!     }
//! }
//! ```

pub mod client;
pub mod model;
pub mod repository;
pub mod server;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HttpStoryClient, StoreError, StoryStore};
pub use model::{ErrorBody, MessageBody, NewStory, Story};
pub use repository::{
    connection_string, JsonFileRepository, MemoryRepository, RepositoryError, StoryRepository,
    DATABASE_ENV,
};
pub use server::{create_router, HttpError, SAVED_MESSAGE};

#[cfg(test)]
pub use client::MockStore;
