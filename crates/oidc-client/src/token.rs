//! Token endpoint protocol: authorization-code exchange and refresh
//!
//! Both operations POST form bodies to `{server_url}/oauth/token` with
//! different grant types. The transport is abstracted behind the
//! [`TokenExchange`] trait so the flow can be driven in tests without a
//! network; [`HttpTokenExchange`] is the reqwest-backed implementation.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::HttpError;

/// Response from the token endpoint for both exchange and refresh.
///
/// `refresh_token` is absent when the server does not grant offline
/// access (or chooses not to rotate on refresh); `id_token` may be
/// omitted from refresh responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

/// Result alias for token endpoint calls.
pub type TokenResult = Result<TokenResponse, HttpError>;

/// Abstraction over the token endpoint transport.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenExchange>`). Each call resolves exactly once, after the
/// network round-trip completes; no retries happen at this layer.
pub trait TokenExchange: Send + Sync {
    /// Exchange an authorization code plus PKCE verifier for tokens.
    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = TokenResult> + Send + 'a>>;

    /// Exchange a refresh token for a fresh token set.
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = TokenResult> + Send + 'a>>;
}

/// reqwest-backed token endpoint client.
pub struct HttpTokenExchange {
    client: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    redirect_uri: String,
}

impl HttpTokenExchange {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        HttpTokenExchange {
            client,
            token_endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> TokenResult {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| HttpError::Transport(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| HttpError::Transport(format!("invalid token response: {e}")))
    }
}

impl TokenExchange for HttpTokenExchange {
    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = TokenResult> + Send + 'a>> {
        Box::pin(async move {
            debug!("exchanging authorization code");
            self.post_form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("code_verifier", verifier),
                ("client_id", &self.client_id),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await
        })
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = TokenResult> + Send + 'a>> {
        Box::pin(async move {
            debug!("refreshing access token");
            self.post_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
            ])
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn exchange_for(server: &MockServer) -> HttpTokenExchange {
        let config = Config::new(
            server.uri(),
            "test-client",
            "https://app.example/callback",
            "/tmp",
        )
        .unwrap();
        HttpTokenExchange::new(reqwest::Client::new(), &config)
    }

    fn token_json() -> serde_json::Value {
        serde_json::json!({
            "access_token": "at_abc",
            "refresh_token": "rt_def",
            "id_token": "idt_ghi",
            "token_type": "Bearer",
            "expires_in": 3600
        })
    }

    #[test]
    fn token_response_tolerates_missing_optional_fields() {
        let json = r#"{"access_token":"at","token_type":"Bearer","expires_in":60}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(response.refresh_token.is_none());
        assert!(response.id_token.is_none());
    }

    #[tokio::test]
    async fn exchange_code_posts_authorization_code_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .and(body_string_contains("client_id=test-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = exchange_for(&server).await;
        let response = exchange
            .exchange_code("the-code", "the-verifier")
            .await
            .unwrap();
        assert_eq!(response.access_token, "at_abc");
        assert_eq!(response.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn refresh_posts_refresh_token_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt_old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at_new",
                "token_type": "Bearer",
                "expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = exchange_for(&server).await;
        let response = exchange.refresh("rt_old").await.unwrap();
        assert_eq!(response.access_token, "at_new");
        assert!(
            response.refresh_token.is_none(),
            "server chose not to rotate"
        );
    }

    #[tokio::test]
    async fn error_status_carries_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":"invalid_grant","error_description":"code expired"}"#,
            ))
            .mount(&server)
            .await;

        let exchange = exchange_for(&server).await;
        let err = exchange.exchange_code("bad", "verifier").await.unwrap_err();
        match &err {
            HttpError::Status { status, body } => {
                assert_eq!(*status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected Status error, got {other:?}"),
        }
        let (error, description) = err.oauth_error().unwrap();
        assert_eq!(error, "invalid_grant");
        assert_eq!(description.as_deref(), Some("code expired"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) refuses connections on a loopback address
        let config = Config::new(
            "http://127.0.0.1:9",
            "test-client",
            "https://app.example/callback",
            "/tmp",
        )
        .unwrap();
        let exchange = HttpTokenExchange::new(reqwest::Client::new(), &config);

        let err = exchange.refresh("rt").await.unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_success_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let exchange = exchange_for(&server).await;
        let err = exchange.exchange_code("code", "verifier").await.unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)), "got {err:?}");
    }
}
