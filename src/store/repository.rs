//! Story persistence behind the store service.
//!
//! [`StoryRepository`] is the storage seam.  Two backends:
//!
//! * [`MemoryRepository`] — process-local, lost on exit;
//! * [`JsonFileRepository`] — one JSON array on disk, rewritten on every
//!   insert.
//!
//! [`open`] picks one from a connection string.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::{NewStory, Story};

/// Errors raised by a repository backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Storage for stories.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Persist `story`, stamped with the current time.
    async fn insert(&self, story: NewStory) -> Result<Story, RepositoryError>;

    /// All stories, newest first.
    async fn list(&self) -> Result<Vec<Story>, RepositoryError>;
}

/// Newest first; equal timestamps keep insertion order reversed.
fn newest_first(stories: &[Story]) -> Vec<Story> {
    let mut sorted: Vec<Story> = stories.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryRepository {
    stories: RwLock<Vec<Story>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryRepository for MemoryRepository {
    async fn insert(&self, story: NewStory) -> Result<Story, RepositoryError> {
        let story = story.into_story(Utc::now());
        self.stories.write().await.push(story.clone());
        Ok(story)
    }

    async fn list(&self) -> Result<Vec<Story>, RepositoryError> {
        Ok(newest_first(&self.stories.read().await))
    }
}

// ---------------------------------------------------------------------------
// JsonFileRepository
// ---------------------------------------------------------------------------

/// Stories kept as a JSON array in one file.
///
/// The whole file is loaded on [`open`](Self::open) and rewritten after each
/// insert; writes are serialised by the lock.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    stories: RwLock<Vec<Story>>,
}

impl JsonFileRepository {
    /// Load `path`, or start empty if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let stories = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "story store: loaded {} stories from {}",
            stories.len(),
            path.display()
        );
        Ok(Self {
            path,
            stories: RwLock::new(stories),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoryRepository for JsonFileRepository {
    async fn insert(&self, story: NewStory) -> Result<Story, RepositoryError> {
        let story = story.into_story(Utc::now());
        let mut stories = self.stories.write().await;

        let mut next = stories.clone();
        next.push(story.clone());
        let bytes = serde_json::to_vec_pretty(&next)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Replace atomically: write a sibling, then rename over the original.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        *stories = next;
        Ok(story)
    }

    async fn list(&self) -> Result<Vec<Story>, RepositoryError> {
        Ok(newest_first(&self.stories.read().await))
    }
}

// ---------------------------------------------------------------------------
// open
// ---------------------------------------------------------------------------

/// Environment variable that overrides the configured connection string.
pub const DATABASE_ENV: &str = "STORY_STORE_DB";

/// Pick the connection string: env override, then config, then `fallback`.
pub fn connection_string(
    env_override: Option<String>,
    configured: Option<&str>,
    fallback: &Path,
) -> String {
    env_override
        .filter(|s| !s.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| fallback.display().to_string())
}

/// Open the repository named by `connection`.
///
/// * `"memory"` or `"memory://"` — [`MemoryRepository`];
/// * `"file://<path>"` or a bare path — [`JsonFileRepository`].
pub async fn open(connection: &str) -> Result<Arc<dyn StoryRepository>, RepositoryError> {
    match connection {
        "memory" | "memory://" => Ok(Arc::new(MemoryRepository::new())),
        other => {
            let path = other.strip_prefix("file://").unwrap_or(other);
            Ok(Arc::new(JsonFileRepository::open(path).await?))
        }
    }
}
