//! Identity provider client.
//!
//! Token verification and user creation are delegated to an external
//! identity provider over REST. The `IdentityProvider` trait is the seam the
//! auth service and the resource-service middleware program against; the
//! HTTP client takes an overridable base URL so tests can point it at a mock
//! server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A verified or freshly created identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Abstraction over the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token. Any provider error yields `IdentityError`.
    async fn verify_token(&self, token: &str) -> Result<Identity, IdentityError>;

    /// Create a user with the given credentials.
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error ({code}): {message}")]
    Provider { code: u16, message: String },

    #[error("Missing credentials")]
    MissingCredentials,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub provider_url: String,
    pub timeout_secs: u64,
}

impl IdentityConfig {
    pub fn new(provider_url: String) -> Self {
        Self {
            provider_url,
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// Provider wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorResponse {
    message: Option<String>,
}

// ============================================================================
// HttpIdentityClient
// ============================================================================

/// REST client for the identity provider.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.provider_url,
        })
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(base_url: String) -> Result<Self, IdentityError> {
        Self::new(IdentityConfig::new(base_url))
    }

    async fn error_from(response: reqwest::Response) -> IdentityError {
        let code = response.status().as_u16();
        let message = match response.json::<ProviderErrorResponse>().await {
            Ok(body) => body.message.unwrap_or_else(|| "unknown error".to_string()),
            Err(_) => "unknown error".to_string(),
        };
        IdentityError::Provider { code, message }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityClient {
    async fn verify_token(&self, token: &str) -> Result<Identity, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let url = format!("{}/verify", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&VerifyRequest { token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.json::<Identity>().await?)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        if email.is_empty() || password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let url = format!("{}/users", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateUserRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.json::<Identity>().await?)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_bearer_token_parses_header() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_rejects_malformed() {
        assert_eq!(bearer_token("abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token(""), None);
    }

    #[tokio::test]
    async fn test_verify_token_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_json(serde_json::json!({"token": "good-token"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uid": "user-1",
                "email": "a@example.com",
            })))
            .mount(&mock_server)
            .await;

        let client = HttpIdentityClient::with_base_url(mock_server.uri()).unwrap();
        let identity = client.verify_token("good-token").await.unwrap();

        assert_eq!(identity.uid, "user-1");
        assert_eq!(identity.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_verify_token_provider_rejection() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "token expired"})),
            )
            .mount(&mock_server)
            .await;

        let client = HttpIdentityClient::with_base_url(mock_server.uri()).unwrap();
        let err = client.verify_token("stale-token").await.unwrap_err();

        match err {
            IdentityError::Provider { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "token expired");
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_token_empty_is_missing_credentials() {
        let client = HttpIdentityClient::with_base_url("http://localhost:1".to_string()).unwrap();
        let err = client.verify_token("").await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users"))
            .and(body_json(serde_json::json!({
                "email": "new@example.com",
                "password": "hunter2",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "uid": "user-2",
                "email": "new@example.com",
            })))
            .mount(&mock_server)
            .await;

        let client = HttpIdentityClient::with_base_url(mock_server.uri()).unwrap();
        let identity = client.create_user("new@example.com", "hunter2").await.unwrap();

        assert_eq!(identity.uid, "user-2");
    }

    #[tokio::test]
    async fn test_create_user_provider_failure_has_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "email already in use"})),
            )
            .mount(&mock_server)
            .await;

        let client = HttpIdentityClient::with_base_url(mock_server.uri()).unwrap();
        let err = client.create_user("dup@example.com", "pw").await.unwrap_err();

        match err {
            IdentityError::Provider { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "email already in use");
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_user_error_without_body_falls_back() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = HttpIdentityClient::with_base_url(mock_server.uri()).unwrap();
        let err = client.create_user("x@example.com", "pw").await.unwrap_err();

        match err {
            IdentityError::Provider { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "unknown error");
            }
            other => panic!("expected Provider error, got {other:?}"),
        }
    }
}
