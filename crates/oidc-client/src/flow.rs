//! Login, redirect handling, refresh, and logout orchestration
//!
//! The flow as the host application drives it:
//! 1. `generate_login_url()` persists the anti-forgery/PKCE parameters
//!    and returns the authorize URL for the host's browser view
//! 2. The browser redirect's query string comes back through
//!    `handle_redirect()`, which validates state, exchanges the code,
//!    and persists the session
//! 3. `refresh()` replaces the token set; `logout()` invalidates the
//!    session and deletes the persisted record
//! 4. `restore_session()` rehydrates a persisted session on startup
//!
//! The engine never navigates or retries on its own; every operation
//! resolves exactly once with a typed result.

use std::sync::Arc;

use common::Secret;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{LoginError, RefreshTokenError, StoreError};
use crate::pkce;
use crate::query;
use crate::session::{Session, SessionStore, StoredUserSession, TokenSet};
use crate::state::{AuthState, AuthStateStore, MfaType};
use crate::token::TokenExchange;

/// Scopes every login request carries, regardless of caller extras.
const BASE_SCOPES: [&str; 2] = ["openid", "offline_access"];

/// Length of the `state` and `nonce` anti-forgery parameters.
const STATE_LEN: usize = 10;
/// Length of the PKCE code verifier.
const VERIFIER_LEN: usize = 60;

/// File names inside the configured storage directory.
const AUTH_STATE_FILE: &str = "auth_state.json";
const SESSIONS_FILE: &str = "sessions.json";

/// The authentication state machine.
///
/// Owns the two persisted stores and the token endpoint transport; the
/// host supplies the redirect query string and a place to keep the
/// returned [`Session`] handle.
pub struct AuthClient {
    config: Config,
    auth_state_store: Arc<AuthStateStore>,
    session_store: Arc<SessionStore>,
    exchange: Arc<dyn TokenExchange>,
}

impl AuthClient {
    pub fn new(
        config: Config,
        auth_state_store: Arc<AuthStateStore>,
        session_store: Arc<SessionStore>,
        exchange: Arc<dyn TokenExchange>,
    ) -> Self {
        AuthClient {
            config,
            auth_state_store,
            session_store,
            exchange,
        }
    }

    /// Open a client with file-backed stores under `config.storage_dir`.
    pub async fn open(config: Config, exchange: Arc<dyn TokenExchange>) -> Result<Self, StoreError> {
        let auth_state_store = Arc::new(
            AuthStateStore::load(config.storage_dir.join(AUTH_STATE_FILE)).await?,
        );
        let session_store =
            Arc::new(SessionStore::load(config.storage_dir.join(SESSIONS_FILE)).await?);
        Ok(Self::new(config, auth_state_store, session_store, exchange))
    }

    /// Build the authorize-endpoint URL for a new login attempt.
    ///
    /// Persisting the [`AuthState`] overwrites any pending attempt - a
    /// device supports one in-flight login, and the previous one becomes
    /// unrecoverable. Pure local computation otherwise; no network call.
    pub async fn generate_login_url(
        &self,
        extra_scopes: &[&str],
        mfa: Option<MfaType>,
        login_hint: Option<&str>,
    ) -> Result<String, LoginError> {
        let state = pkce::random_string(STATE_LEN);
        let nonce = pkce::random_string(STATE_LEN);
        let verifier = pkce::random_string(VERIFIER_LEN);
        let challenge = pkce::code_challenge(&verifier);

        self.auth_state_store
            .set(AuthState {
                state: state.clone(),
                nonce: nonce.clone(),
                code_verifier: Secret::new(verifier),
                mfa,
            })
            .await?;

        let scope = join_scopes(extra_scopes);
        let mut pairs: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("state", state.as_str()),
            ("scope", scope.as_str()),
            ("nonce", nonce.as_str()),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
        ];
        // Requesting an MFA method suppresses the account chooser; the
        // two prompts are mutually exclusive on the wire.
        match mfa {
            Some(m) => pairs.push(("acr_values", m.acr_value())),
            None => pairs.push(("prompt", "select_account")),
        }
        if let Some(hint) = login_hint {
            pairs.push(("login_hint", hint));
        }

        debug!("generated login url for new attempt");
        Ok(format!(
            "{}?{}",
            self.config.authorize_endpoint(),
            query::encode(pairs)
        ))
    }

    /// Process the authorization server's redirect response.
    ///
    /// The pending attempt is consumed exactly once: the slot is cleared
    /// as soon as its `state` matches, before the token exchange, so a
    /// replayed redirect can never trigger a second exchange. A mismatched
    /// `state` leaves the slot intact - a later redirect carrying the
    /// right value can still complete the flow.
    pub async fn handle_redirect(
        &self,
        query_string: Option<&str>,
    ) -> Result<Session, LoginError> {
        let Some(query_string) = query_string else {
            return Err(LoginError::Unexpected("No authentication response".into()));
        };
        let params = query::decode(Some(query_string));

        let Some(pending) = self.auth_state_store.get().await else {
            return Err(LoginError::AuthStateRead);
        };

        if params.get("state").map(String::as_str) != Some(pending.state.as_str()) {
            warn!("redirect state does not match the pending login attempt");
            return Err(LoginError::UnsolicitedResponse);
        }
        self.auth_state_store.remove().await?;

        if let Some(error) = params.get("error") {
            return Err(LoginError::ErrorResponse {
                error: error.clone(),
                description: params.get("error_description").cloned(),
            });
        }

        let Some(code) = params.get("code") else {
            return Err(LoginError::Unexpected(
                "Missing authorization code in authentication response".into(),
            ));
        };

        let response = self
            .exchange
            .exchange_code(code, pending.code_verifier.expose())
            .await
            .map_err(LoginError::TokenExchange)?;

        let tokens = TokenSet::from(response);
        self.session_store
            .save(StoredUserSession::new(
                self.config.client_id.clone(),
                tokens.clone(),
            ))
            .await?;
        info!("login completed, session persisted");
        Ok(Session::new(self.config.client_id.clone(), tokens))
    }

    /// Exchange the session's refresh token for a fresh token set.
    ///
    /// The session lock is NOT held across the network wait (the sole
    /// suspension point in the engine), so a logout stays fast while a
    /// refresh is in flight. The commit afterwards checks the
    /// invalidation flag and the write as one critical section; a logout
    /// that completed first wins, and nothing is written back.
    pub async fn refresh(&self, session: &Session) -> Result<TokenSet, RefreshTokenError> {
        let current = session.tokens().await;
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Err(RefreshTokenError::NoRefreshToken);
        };

        let response = self
            .exchange
            .refresh(&refresh_token)
            .await
            .map_err(RefreshTokenError::RequestFailed)?;

        let tokens = current.refreshed(response);
        let committed = session
            .commit_refreshed(tokens, &self.session_store)
            .await?;
        info!("token refresh committed");
        Ok(committed)
    }

    /// Invalidate the session and delete its persisted record.
    ///
    /// No network call; the invalidation happens regardless of whether
    /// the store removal succeeds.
    pub async fn logout(&self, session: &Session) -> Result<(), StoreError> {
        session.invalidate(&self.session_store).await
    }

    /// Rehydrate the persisted session for this client id, if any.
    pub async fn restore_session(&self) -> Option<Session> {
        let record = self.session_store.get(&self.config.client_id).await?;
        debug!(updated_at = record.updated_at, "restored persisted session");
        Some(Session::new(record.client_id, record.tokens))
    }
}

/// Union the baseline scopes with caller extras, preserving insertion
/// order and collapsing duplicates.
fn join_scopes(extra: &[&str]) -> String {
    let mut scopes: Vec<&str> = BASE_SCOPES.to_vec();
    for scope in extra {
        if !scopes.contains(scope) {
            scopes.push(scope);
        }
    }
    scopes.join(" ")
}
