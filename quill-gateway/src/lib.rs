//! API gateway.
//!
//! Forwards inbound requests unmodified to the resource services by fixed
//! address and relays the upstream status and body verbatim. Deliberately
//! no retries, no timeout override, no aggregation: an upstream failure
//! surfaces as a 500 with the standard error body.
//!
//! Endpoints:
//! - GET /health — liveness probe
//! - GET /todos  — forward to `<todo_base>/api/v1/todos`
//! - GET /notes  — forward to `<notes_base>/api/v1/notes`

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use quill_core::config::GatewayConfig;
use reqwest::Client;
use tokio::sync::broadcast;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct GatewayState {
    pub client: Client,
    pub config: GatewayConfig,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/todos", get(todos_handler))
        .route("/notes", get(notes_handler))
        .with_state(state)
}

/// Start the HTTP server on the given address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    addr: String,
    state: Arc<GatewayState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quill gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Forwarding
// ============================================================================

/// Inner forward — issues the upstream GET and returns the upstream status
/// and body verbatim, or the error string on a connection-level failure.
pub async fn forward_inner(
    client: &Client,
    base: &str,
    path: &str,
) -> std::result::Result<(StatusCode, Bytes), String> {
    let url = format!("{base}{path}");

    let response = client.get(&url).send().await.map_err(|e| e.to_string())?;
    let status = StatusCode::from_u16(response.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.bytes().await.map_err(|e| e.to_string())?;

    Ok((status, body))
}

async fn proxy(state: &GatewayState, base: &str, path: &str) -> Response {
    match forward_inner(&state.client, base, path).await {
        Ok((status, body)) => (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(upstream = base, path, error = %e, "upstream call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e, "status": "error"})),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Axum handler wrappers
// ============================================================================

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

pub async fn todos_handler(State(state): State<Arc<GatewayState>>) -> Response {
    proxy(&state, &state.config.todo_service_url, "/api/v1/todos").await
}

pub async fn notes_handler(State(state): State<Arc<GatewayState>>) -> Response {
    proxy(&state, &state.config.notes_service_url, "/api/v1/notes").await
}

// ============================================================================
// Unit Tests — wiremock stands in for the upstream services
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_state(todo_base: String, notes_base: String) -> Arc<GatewayState> {
        Arc::new(GatewayState::new(GatewayConfig {
            todo_service_url: todo_base,
            notes_service_url: notes_base,
        }))
    }

    async fn body_bytes(resp: Response) -> Bytes {
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_todos_forwarded_verbatim() {
        let upstream = MockServer::start().await;
        let payload = json!([
            {"id": 1, "title": "A", "content": "B"},
            {"id": 2, "title": "C", "content": "D"},
        ]);

        Mock::given(method("GET"))
            .and(path("/api/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .mount(&upstream)
            .await;

        let state = make_state(upstream.uri(), "http://localhost:1".to_string());
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/todos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_bytes(resp).await;
        let relayed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(relayed, payload, "upstream body must be relayed unchanged");
    }

    #[tokio::test]
    async fn test_notes_forwarded_to_notes_upstream() {
        let upstream = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&upstream)
            .await;

        let state = make_state("http://localhost:1".to_string(), upstream.uri());
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/notes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_bytes(resp).await;
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_upstream_status_relayed() {
        let upstream = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/todos"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"error": "maintenance"})),
            )
            .mount(&upstream)
            .await;

        let state = make_state(upstream.uri(), "http://localhost:1".to_string());
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/todos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        // Nothing listens on port 1.
        let state = make_state(
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:1".to_string(),
        );
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/todos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_bytes(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let state = make_state(
            "http://localhost:1".to_string(),
            "http://localhost:1".to_string(),
        );
        let app = build_router(state);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
    }
}
