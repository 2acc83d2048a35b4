//! Bearer-token middleware for mutating routes.
//!
//! Replaces the original decorator-style gating with an explicit layer
//! composed at route-registration time. The source services disagreed on
//! which handlers to protect; the policy here is: all PUT/DELETE routes are
//! gated when `auth.protect_mutations` is set, POST/GET stay open.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::identity::bearer_token;

use crate::http::{ErrorResponse, HttpState};

fn unauthorized(msg: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(msg))).into_response()
}

/// Reject the request unless it carries a bearer token the identity
/// provider accepts.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let token = match token {
        Some(t) => t.to_string(),
        None => return unauthorized("missing bearer token"),
    };

    match state.identity.verify_token(&token).await {
        Ok(identity) => {
            tracing::debug!(uid = %identity.uid, "token verified");
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "token rejected");
            unauthorized("invalid bearer token")
        }
    }
}
