//! Resource service HTTP layer.
//!
//! Axum-based HTTP server mapping verbs to store calls for one record
//! resource (notes or todos, selected at startup).
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function. The inner functions are directly testable without
//! axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /                       — welcome message
//! - GET    /health                 — health check with DB status
//! - POST   /api/v1/{resource}      — create a record
//! - GET    /api/v1/{resource}      — list all records
//! - PUT    /api/v1/{resource}/{id} — update a record
//! - DELETE /api/v1/{resource}/{id} — delete a record
//!
//! PUT and DELETE pass through the bearer-token middleware when
//! `auth.protect_mutations` is enabled.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use quill_core::{IdentityProvider, QuillConfig, QuillError, RecordStore};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: RecordStore,
    pub config: QuillConfig,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Build the Axum router with all endpoints.
///
/// The middleware chain is composed here, at route-registration time: the
/// mutation routes get the bearer check layered on when the config asks for
/// it, everything else stays open.
pub fn build_router(state: Arc<HttpState>) -> Router {
    let mut mutations = Router::new()
        .route("/:id", put(update_handler).delete(delete_handler));

    if state.config.auth.protect_mutations {
        mutations = mutations.layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_bearer,
        ));
    }

    let collection = Router::new().route("/", post(create_handler).get(list_handler));

    let prefix = format!("/api/v1/{}", state.store.resource().route());
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest(&prefix, collection.merge(mutations));

    if state.config.http.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let resource = state.store.resource();

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quill {} service listening on http://{}", resource, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordPayload {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

/// Map a store error to a status code and the standard error body.
pub fn error_to_http(err: &QuillError) -> (StatusCode, serde_json::Value) {
    let status = match err {
        QuillError::Validation(_) => StatusCode::BAD_REQUEST,
        QuillError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::to_value(ErrorResponse::new(err.to_string()))
        .unwrap_or_else(|_| serde_json::json!({"error": "serialization failure", "status": "error"}));
    (status, body)
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool, resource: &str) -> (StatusCode, serde_json::Value) {
    let pg_ver = match quill_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "resource": resource,
            "postgresql": pg_ver,
        }),
    )
}

/// Inner create — validates the payload and persists a record.
/// Success mirrors the original wire shape: 201 with just the new id.
pub async fn create_inner(
    store: &RecordStore,
    payload: RecordPayload,
) -> (StatusCode, serde_json::Value) {
    let (title, content) = match (payload.title, payload.content) {
        (Some(t), Some(c)) => (t, c),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "title and content fields are required",
                    "status": "error",
                }),
            );
        }
    };

    match store.create(&title, &content).await {
        Ok(record) => (StatusCode::CREATED, serde_json::json!({"id": record.id})),
        Err(e) => error_to_http(&e),
    }
}

/// Inner list — returns every record as a JSON array.
pub async fn list_inner(store: &RecordStore) -> (StatusCode, serde_json::Value) {
    match store.list().await {
        Ok(records) => match serde_json::to_value(&records) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": e.to_string(), "status": "error"}),
            ),
        },
        Err(e) => error_to_http(&e),
    }
}

/// Inner update — overwrites both fields, 404 when the id is absent.
pub async fn update_inner(
    store: &RecordStore,
    id: i64,
    payload: RecordPayload,
) -> (StatusCode, serde_json::Value) {
    let (title, content) = match (payload.title, payload.content) {
        (Some(t), Some(c)) => (t, c),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "title and content fields are required",
                    "status": "error",
                }),
            );
        }
    };

    match store.update(id, &title, &content).await {
        Ok(record) => (
            StatusCode::OK,
            serde_json::json!({
                "id": record.id,
                "title": record.title,
                "content": record.content,
            }),
        ),
        Err(e) => error_to_http(&e),
    }
}

/// Inner delete — 204 on removal, 404 when the id was already absent.
pub async fn delete_inner(store: &RecordStore, id: i64) -> (StatusCode, serde_json::Value) {
    match store.delete(id).await {
        Ok(true) => (StatusCode::NO_CONTENT, serde_json::Value::Null),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({
                "error": format!("Record {id} not found"),
                "status": "error",
            }),
        ),
        Err(e) => error_to_http(&e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn root_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let message = format!("Welcome to the Quill {} API", state.store.resource());
    (StatusCode::OK, Json(serde_json::json!({"message": message})))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) =
        health_inner(state.store.pool(), state.store.resource().table()).await;
    (status, Json(body))
}

pub async fn create_handler(
    State(state): State<Arc<HttpState>>,
    Json(payload): Json<RecordPayload>,
) -> impl IntoResponse {
    let (status, body) = create_inner(&state.store, payload).await;
    (status, Json(body))
}

pub async fn list_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = list_inner(&state.store).await;
    (status, Json(body))
}

pub async fn update_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<i64>,
    Json(payload): Json<RecordPayload>,
) -> impl IntoResponse {
    let (status, body) = update_inner(&state.store, id, payload).await;
    (status, Json(body))
}

pub async fn delete_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<i64>,
) -> Response {
    let (status, body) = delete_inner(&state.store, id).await;
    if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else {
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Unit Tests — pure helpers; store-backed paths live in tests/
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_to_http_validation_is_400() {
        let err = QuillError::Validation("title is required".to_string());
        let (status, body) = error_to_http(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("title"));
    }

    #[test]
    fn test_error_to_http_not_found_is_404() {
        let err = QuillError::NotFound { id: 42 };
        let (status, body) = error_to_http(&err);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("42"));
    }

    #[test]
    fn test_error_to_http_database_is_500() {
        let err = QuillError::Database(sqlx::Error::PoolClosed);
        let (status, body) = error_to_http(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ErrorResponse::new("boom")).unwrap();
        assert_eq!(body["error"], "boom");
        assert_eq!(body["status"], "error");
    }
}
