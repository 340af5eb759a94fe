//! HTTP routes of the story store service.
//!
//! ```text
//! POST /api/save     {title, content} → 201 {message} | 500 {error}
//! GET  /api/stories                   → 200 [{title, content, date}] (newest first)
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

use super::model::{ErrorBody, MessageBody, NewStory, Story};
use super::repository::StoryRepository;

/// Confirmation returned by a successful save.
pub const SAVED_MESSAGE: &str = "Story Saved Successfully!";

/// Errors surfaced by the handlers.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Storage failed; the message is safe to show to clients.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Clone)]
struct ServerState {
    repo: Arc<dyn StoryRepository>,
}

/// Build the service router over `repo`, with permissive CORS.
pub fn create_router(repo: Arc<dyn StoryRepository>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/save", post(save_story))
        .route("/api/stories", get(list_stories))
        .layer(cors)
        .with_state(ServerState { repo })
}

async fn save_story(
    State(state): State<ServerState>,
    Json(story): Json<NewStory>,
) -> Result<(StatusCode, Json<MessageBody>), HttpError> {
    match state.repo.insert(story).await {
        Ok(saved) => {
            log::info!("story store: saved {:?} ({} chars)", saved.title, saved.content.len());
            Ok((
                StatusCode::CREATED,
                Json(MessageBody {
                    message: SAVED_MESSAGE.into(),
                }),
            ))
        }
        Err(e) => {
            log::error!("story store: save failed: {e}");
            Err(HttpError::Internal("Failed to save".into()))
        }
    }
}

async fn list_stories(State(state): State<ServerState>) -> Result<Json<Vec<Story>>, HttpError> {
    state.repo.list().await.map(Json).map_err(|e| {
        log::error!("story store: list failed: {e}");
        HttpError::Internal("Failed to fetch".into())
    })
}
