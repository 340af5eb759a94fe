//! `StoryStore` trait and the HTTP client for the story store service.
//!
//! All connection details come from [`StoreConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StoreConfig;

use super::model::{ErrorBody, MessageBody, NewStory, Story};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the story store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Connection refused, DNS failure, or other transport error.
    #[error("story store unreachable: {0}")]
    Unreachable(String),

    /// The request did not complete within the configured timeout.
    #[error("story store timed out")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("story store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be parsed.
    #[error("failed to parse story store response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_decode() {
            StoreError::Parse(e.to_string())
        } else {
            StoreError::Unreachable(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// StoryStore trait
// ---------------------------------------------------------------------------

/// The two operations the pipeline needs from the remote store.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Persist a story; returns the service's confirmation message.
    async fn save(&self, story: &NewStory) -> Result<String, StoreError>;

    /// All stories, newest first.
    async fn list(&self) -> Result<Vec<Story>, StoreError>;
}

// ---------------------------------------------------------------------------
// HttpStoryClient
// ---------------------------------------------------------------------------

/// Calls `POST /api/save` and `GET /api/stories` on the configured base URL.
pub struct HttpStoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStoryClient {
    /// Build a client from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// fallback if the builder fails.
    pub fn from_config(config: &StoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Turn a non-2xx response into [`StoreError::Rejected`], preferring the
    /// service's `{"error": ...}` text.
    async fn rejection(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        };
        StoreError::Rejected { status, message }
    }
}

#[async_trait]
impl StoryStore for HttpStoryClient {
    async fn save(&self, story: &NewStory) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.url("/api/save"))
            .json(story)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: MessageBody = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(body.message)
    }

    async fn list(&self) -> Result<Vec<Story>, StoreError> {
        let response = self.client.get(self.url("/api/stories")).send().await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockStore  (test-only)
// ---------------------------------------------------------------------------

/// In-memory [`StoryStore`] for pipeline tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockStore {
    saved: std::sync::Mutex<Vec<NewStory>>,
    failure: Option<StoreError>,
}

#[cfg(test)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with `error`.
    pub fn failing(error: StoreError) -> Self {
        Self {
            saved: std::sync::Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn saved(&self) -> Vec<NewStory> {
        self.saved.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl StoryStore for MockStore {
    async fn save(&self, story: &NewStory) -> Result<String, StoreError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.saved.lock().unwrap().push(story.clone());
        Ok("Story Saved Successfully!".into())
    }

    async fn list(&self) -> Result<Vec<Story>, StoreError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let now = chrono::Utc::now();
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .rev()
            .cloned()
            .map(|s| s.into_story(now))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> StoreConfig {
        StoreConfig {
            base_url: base_url.into(),
            timeout_secs: 2,
            default_title: "My Story".into(),
        }
    }

    #[test]
    fn from_config_strips_trailing_slash() {
        let client = HttpStoryClient::from_config(&config("http://localhost:5000/"));
        assert_eq!(client.url("/api/save"), "http://localhost:5000/api/save");
    }

    #[test]
    fn client_is_object_safe() {
        let store: Box<dyn StoryStore> =
            Box::new(HttpStoryClient::from_config(&config("http://localhost:5000")));
        drop(store);
    }

    #[tokio::test]
    async fn unreachable_store_is_reported() {
        // Port 9 (discard) on localhost is practically never listening.
        let client = HttpStoryClient::from_config(&config("http://127.0.0.1:9"));
        let err = client.save(&NewStory::new("t", "c")).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Unreachable(_) | StoreError::Timeout),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn store_error_display() {
        let e = StoreError::Rejected {
            status: 500,
            message: "Failed to save".into(),
        };
        assert!(e.to_string().contains("500"));
        assert!(e.to_string().contains("Failed to save"));
    }
}
