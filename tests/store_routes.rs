//! Story store service, end to end: router over a real repository, and the
//! HTTP client against a live socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use voice_reader::config::StoreConfig;
use voice_reader::store::{
    create_router, repository, HttpStoryClient, MemoryRepository, NewStory, Story, StoreError,
    StoryStore, SAVED_MESSAGE,
};

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

#[tokio::test]
async fn save_then_list_returns_the_story() {
    let app = create_router(Arc::new(MemoryRepository::new()));
    let before = Utc::now();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/save")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"t","content":"c"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/stories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stories: Vec<Story> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].title, "t");
    assert_eq!(stories[0].content, "c");
    assert!(stories[0].date >= before - chrono::Duration::seconds(1));
    assert!(stories[0].date <= Utc::now());
}

#[tokio::test]
async fn missing_fields_default_to_empty() {
    let app = create_router(Arc::new(MemoryRepository::new()));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/save")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/stories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let stories: Vec<Story> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(stories[0].title, "");
    assert_eq!(stories[0].content, "");
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let app = create_router(Arc::new(MemoryRepository::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/save")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn client_round_trip_over_a_live_socket() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stories.json");
    let repo = repository::open(path.to_str().unwrap()).await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(repo)).await.unwrap();
    });

    let client = HttpStoryClient::from_config(&StoreConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 5,
        default_title: "My Story".into(),
    });

    let message = client
        .save(&NewStory::new("First", "Once upon a time"))
        .await
        .unwrap();
    assert_eq!(message, SAVED_MESSAGE);
    client.save(&NewStory::new("Second", "The end")).await.unwrap();

    let titles: Vec<String> = client
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
    assert!(path.exists());

    server.abort();
}

#[tokio::test]
async fn client_reports_unreachable_store() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = HttpStoryClient::from_config(&StoreConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 2,
        default_title: "My Story".into(),
    });

    let err = client.list().await.unwrap_err();
    assert!(
        matches!(err, StoreError::Unreachable(_) | StoreError::Timeout),
        "unexpected error: {err:?}"
    );
}
