//! HTTP adapter
//!
//! Exposes the store over a small CRUD interface:
//!
//! | Method   | Path             | Result                                         |
//! |----------|------------------|------------------------------------------------|
//! | `POST`   | `/add`           | 200, 400 on a malformed body                   |
//! | `GET`    | `/get/{word}`    | 200 with `{"word","definition"}`, 404 if absent |
//! | `DELETE` | `/remove/{word}` | 200 whether or not the word existed            |
//! | `GET`    | `/list`          | 200 with `word: definition` lines, sorted      |
//!
//! Any other method on these paths gets 405. Persistence failures map to 500.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use wordbook_core::Store;

use crate::output::format_lines;

/// Body of `POST /add`
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub word: String,
    pub definition: String,
}

/// Body returned by the mutating endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResponse {
    fn ok() -> Self {
        Self {
            success: true,
            removed: None,
            error: None,
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            removed: None,
            error: Some(error.to_string()),
        }
    }
}

/// Build the router over a shared store
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/add", post(handle_add))
        .route("/get/:word", get(handle_get))
        .route("/remove/:word", delete(handle_remove))
        .route("/list", get(handle_list))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Bind and serve until Ctrl-C
pub async fn serve(store: Store, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!(
        "Serving {} on http://{}",
        store.path().display(),
        listener.local_addr()?
    );

    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let revision = *changes.borrow_and_update();
            debug!("Dictionary now at revision {}", revision);
        }
    });

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn handle_add(State(store): State<Store>, body: Bytes) -> (StatusCode, Json<MutationResponse>) {
    let req: AddRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("Rejected malformed add request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(MutationResponse::failed(format!("Invalid request body: {}", e))),
            );
        }
    };

    match store.add(req.word, req.definition).await {
        Ok(()) => (StatusCode::OK, Json(MutationResponse::ok())),
        Err(e) => {
            error!("Failed to add entry: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MutationResponse::failed(e)),
            )
        }
    }
}

async fn handle_get(State(store): State<Store>, Path(word): Path<String>) -> Response {
    match store.get(&word) {
        Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_remove(
    State(store): State<Store>,
    Path(word): Path<String>,
) -> (StatusCode, Json<MutationResponse>) {
    match store.remove(word).await {
        Ok(removed) => (
            StatusCode::OK,
            Json(MutationResponse {
                removed: Some(removed),
                ..MutationResponse::ok()
            }),
        ),
        Err(e) => {
            error!("Failed to remove entry: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MutationResponse::failed(e)),
            )
        }
    }
}

async fn handle_list(State(store): State<Store>) -> String {
    format_lines(&store.list())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wordbook_core::Entry;

    async fn test_store(temp_dir: &TempDir) -> Store {
        Store::open(temp_dir.path().join("dictionary.json"))
            .await
            .unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir).await;
        let app = router(store.clone());

        let (status, _) = send(
            &app,
            "POST",
            "/add",
            Some(r#"{"word":"hello","definition":"bonjour"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/get/hello", None).await;
        assert_eq!(status, StatusCode::OK);
        let entry: Entry = serde_json::from_str(&body).unwrap();
        assert_eq!(entry, Entry::new("hello", "bonjour"));
    }

    #[tokio::test]
    async fn test_get_missing_is_404() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_store(&temp_dir).await);

        let (status, _) = send(&app, "GET", "/get/absent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_malformed_body_is_400() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir).await;
        let app = router(store.clone());

        let (status, _) = send(&app, "POST", "/add", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/add", Some(r#"{"word":"go"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_store(&temp_dir).await);

        let (status, _) = send(&app, "GET", "/add", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(&app, "GET", "/remove/go", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(&app, "POST", "/list", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_remove_is_200_either_way() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir).await;
        let app = router(store.clone());

        store.add("world", "monde").await.unwrap();

        let (status, body) = send(&app, "DELETE", "/remove/world", None).await;
        assert_eq!(status, StatusCode::OK);
        let response: MutationResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.removed, Some(true));
        assert!(store.get("world").is_none());

        let (status, body) = send(&app, "DELETE", "/remove/world", None).await;
        assert_eq!(status, StatusCode::OK);
        let response: MutationResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.removed, Some(false));
    }

    #[tokio::test]
    async fn test_list_is_sorted_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir).await;
        let app = router(store.clone());

        store.add("hello", "bonjour").await.unwrap();
        store.add("go", "aller").await.unwrap();
        store.add("world", "monde").await.unwrap();

        let (status, body) = send(&app, "GET", "/list", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "go: aller\nhello: bonjour\nworld: monde\n");
    }

    #[tokio::test]
    async fn test_add_persistence_failure_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir).await;
        let app = router(store.clone());

        std::fs::write(temp_dir.path().join("dictionary.json"), "garbage").unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/add",
            Some(r#"{"word":"go","definition":"aller"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let response: MutationResponse = serde_json::from_str(&body).unwrap();
        assert!(!response.success);
        assert!(response.error.is_some());
    }
}
