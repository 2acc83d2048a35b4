//! Auth validator service.
//!
//! Verifies bearer credentials against the identity provider and delegates
//! user creation to it. Holds no database state of its own.
//!
//! Endpoints:
//! - GET  /health   — liveness probe
//! - GET  /validate — verify the `Authorization: Bearer <token>` header
//! - POST /signup   — create a user with email + password

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use quill_core::identity::bearer_token;
use quill_core::IdentityProvider;
use serde::Deserialize;
use tokio::sync::broadcast;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<dyn IdentityProvider>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/validate", get(validate_handler))
        .route("/signup", post(signup_handler))
        .with_state(state)
}

/// Start the HTTP server on the given address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    addr: String,
    state: Arc<AuthState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quill auth service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner validate — any missing header or provider error yields 401.
pub async fn validate_inner(
    identity: &dyn IdentityProvider,
    auth_header: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let token = match auth_header.and_then(bearer_token) {
        Some(t) => t,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"error": "Unauthorized", "status": "error"}),
            );
        }
    };

    match identity.verify_token(token).await {
        Ok(id) => match serde_json::to_value(&id) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": e.to_string(), "status": "error"}),
            ),
        },
        Err(e) => {
            tracing::warn!(error = %e, "token verification failed");
            (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"error": "Unauthorized", "status": "error"}),
            )
        }
    }
}

/// Inner signup — missing fields yield 400, provider failure yields 400
/// with the provider's message.
pub async fn signup_inner(
    identity: &dyn IdentityProvider,
    req: SignupRequest,
) -> (StatusCode, serde_json::Value) {
    let (email, password) = match (req.email, req.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": "email and password are required", "status": "error"}),
            );
        }
    };

    match identity.create_user(&email, &password).await {
        Ok(id) => (
            StatusCode::CREATED,
            serde_json::json!({"uid": id.uid, "email": id.email}),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "user creation failed");
            (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": format!("Failed to create user: {e}"),
                    "status": "error",
                }),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
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

pub async fn validate_handler(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let (status, body) = validate_inner(state.identity.as_ref(), auth_header).await;
    (status, Json(body))
}

pub async fn signup_handler(
    State(state): State<Arc<AuthState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    let (status, body) = signup_inner(state.identity.as_ref(), req).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — wiremock stands in for the identity provider
// ============================================================================
