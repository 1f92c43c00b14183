//! Error types for the authentication engine
//!
//! Each failure family is a sealed enum so callers match exhaustively
//! instead of string-comparing. All variants are recoverable: nothing in
//! this crate panics on a failed login or refresh, and no operation
//! retries on its own.

use thiserror::Error;

/// Errors from the persisted stores (auth state, session).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("store parse error: {0}")]
    Parse(String),
}

/// Transport or HTTP-level failure from the token endpoint.
///
/// The raw body is carried opaquely. The only interpretation this crate
/// applies is pulling the OAuth `error` / `error_description` pair out of
/// a JSON body when one is present.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl HttpError {
    /// Extract the OAuth `error` / `error_description` pair from an error
    /// response body, when present.
    pub fn oauth_error(&self) -> Option<(String, Option<String>)> {
        let HttpError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let error = value.get("error")?.as_str()?.to_owned();
        let description = value
            .get("error_description")
            .and_then(|d| d.as_str())
            .map(str::to_owned);
        Some((error, description))
    }
}

/// Errors from login URL generation and redirect handling.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The redirect was missing entirely or structurally unusable.
    #[error("{0}")]
    Unexpected(String),

    /// No login attempt is pending, so the redirect cannot be matched.
    /// Also the outcome of replaying an already-consumed redirect.
    #[error("no pending authentication state")]
    AuthStateRead,

    /// The redirect's `state` does not match the pending attempt - a
    /// stale redirect or a forgery. The pending attempt stays intact.
    #[error("authentication response does not match the pending login attempt")]
    UnsolicitedResponse,

    /// The authorization server answered the redirect with an error.
    #[error("authorization server returned error: {error}")]
    ErrorResponse {
        error: String,
        description: Option<String>,
    },

    /// The authorization-code exchange failed at the token endpoint.
    #[error("token exchange failed: {0}")]
    TokenExchange(HttpError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from token refresh.
#[derive(Debug, Error)]
pub enum RefreshTokenError {
    #[error("no refresh token available for this session")]
    NoRefreshToken,

    #[error("refresh request failed: {0}")]
    RequestFailed(HttpError),

    /// The session was invalidated while the refresh was waiting on the
    /// token endpoint; nothing was written back.
    #[error("User has logged-out during token refresh")]
    LoggedOutDuringRefresh,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_error_extracted_from_json_body() {
        let err = HttpError::Status {
            status: 400,
            body: r#"{"error":"invalid_grant","error_description":"code expired"}"#.into(),
        };
        let (error, description) = err.oauth_error().unwrap();
        assert_eq!(error, "invalid_grant");
        assert_eq!(description.as_deref(), Some("code expired"));
    }

    #[test]
    fn oauth_error_description_is_optional() {
        let err = HttpError::Status {
            status: 400,
            body: r#"{"error":"invalid_request"}"#.into(),
        };
        let (error, description) = err.oauth_error().unwrap();
        assert_eq!(error, "invalid_request");
        assert!(description.is_none());
    }

    #[test]
    fn oauth_error_none_for_opaque_bodies() {
        let html = HttpError::Status {
            status: 502,
            body: "<html>bad gateway</html>".into(),
        };
        assert!(html.oauth_error().is_none());

        let transport = HttpError::Transport("connection refused".into());
        assert!(transport.oauth_error().is_none());
    }

    #[test]
    fn logged_out_message_is_stable() {
        // Callers display this to users; the wording is part of the contract.
        assert_eq!(
            RefreshTokenError::LoggedOutDuringRefresh.to_string(),
            "User has logged-out during token refresh"
        );
    }
}
