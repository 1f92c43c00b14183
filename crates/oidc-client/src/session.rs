//! User sessions: token snapshots, the persisted record, and the live handle
//!
//! A [`TokenSet`] is an immutable snapshot - refresh replaces it wholesale
//! via copy-with-replacement, never by mutating fields in place. The
//! persisted [`StoredUserSession`] is keyed by client id (one authenticated
//! identity per client installation). The runtime [`Session`] wraps the
//! current snapshot together with an invalidation flag behind a single
//! lock; that pair is the one piece of shared mutable state that refresh
//! and logout both touch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{RefreshTokenError, StoreError};
use crate::persist;
use crate::token::TokenResponse;

/// Immutable snapshot of the tokens issued for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    /// Absent when the server did not grant offline access.
    pub refresh_token: Option<String>,
    pub id_token: String,
    pub token_type: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in_secs: u64,
}

impl TokenSet {
    /// Build the replacement snapshot after a successful refresh.
    ///
    /// Refresh-token rotation is optional on the server side: when the
    /// response carries no refresh token, the one used for the request is
    /// kept. Same posture for the id token, which refresh responses may
    /// omit.
    pub fn refreshed(&self, response: TokenResponse) -> TokenSet {
        TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            id_token: response.id_token.unwrap_or_else(|| self.id_token.clone()),
            token_type: response.token_type,
            expires_in_secs: response.expires_in,
        }
    }
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token.unwrap_or_default(),
            token_type: response.token_type,
            expires_in_secs: response.expires_in,
        }
    }
}

/// Durable record of an authenticated user's tokens for a client id.
///
/// Created on successful code exchange, replaced on every successful
/// refresh, deleted on logout. Always carries a non-empty access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUserSession {
    pub client_id: String,
    pub tokens: TokenSet,
    /// Unix timestamp in milliseconds of the last token write
    pub updated_at: u64,
}

impl StoredUserSession {
    /// Stamp a new record with the current time.
    pub fn new(client_id: String, tokens: TokenSet) -> Self {
        StoredUserSession {
            client_id,
            tokens,
            updated_at: now_millis(),
        }
    }
}

/// Current unix time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// File-backed store of persisted sessions, keyed by client id.
///
/// The Mutex serializes all writes; reads briefly take the lock to clone
/// the record. Writes are atomic (temp file + rename) and 0600, since the
/// file holds OAuth tokens.
pub struct SessionStore {
    path: PathBuf,
    state: Mutex<HashMap<String, StoredUserSession>>,
}

impl SessionStore {
    /// Open the store at the given file path.
    ///
    /// A missing file is a cold start with no persisted session.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let state: HashMap<String, StoredUserSession> =
            persist::read_json(&path).await?.unwrap_or_default();
        if !state.is_empty() {
            info!(path = %path.display(), sessions = state.len(), "loaded persisted sessions");
        }
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Persist a session, replacing any existing record for its client id.
    pub async fn save(&self, session: StoredUserSession) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        debug!(client_id = %session.client_id, "saving session");
        state.insert(session.client_id.clone(), session);
        persist::write_atomic(&self.path, &*state).await
    }

    /// Clone the persisted session for a client id, if any.
    pub async fn get(&self, client_id: &str) -> Option<StoredUserSession> {
        let state = self.state.lock().await;
        state.get(client_id).cloned()
    }

    /// Delete the persisted session for a client id. Idempotent.
    pub async fn remove(&self, client_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.remove(client_id).is_some() {
            debug!(client_id, "removed session");
            persist::write_atomic(&self.path, &*state).await?;
        }
        Ok(())
    }
}

/// Live handle for the authenticated user's tokens.
///
/// `tokens` and `invalidated` sit behind one lock so the refresh commit
/// can check-then-write as a single critical section: a logout that
/// completes before the commit is always observed, and stale tokens are
/// never written back over a logged-out session. The lock is never held
/// across a network wait - only across the commit itself.
#[derive(Debug)]
pub struct Session {
    client_id: String,
    state: Mutex<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    tokens: TokenSet,
    invalidated: bool,
}

impl Session {
    pub(crate) fn new(client_id: String, tokens: TokenSet) -> Self {
        Session {
            client_id,
            state: Mutex::new(SessionState {
                tokens,
                invalidated: false,
            }),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Snapshot of the current tokens.
    pub async fn tokens(&self) -> TokenSet {
        self.state.lock().await.tokens.clone()
    }

    /// Whether this handle has been logged out.
    pub async fn is_invalidated(&self) -> bool {
        self.state.lock().await.invalidated
    }

    /// Commit a refreshed token set: atomic check-then-write against the
    /// invalidation flag.
    ///
    /// Fails without touching the store when a logout completed while the
    /// refresh was waiting on the token endpoint.
    pub(crate) async fn commit_refreshed(
        &self,
        tokens: TokenSet,
        store: &SessionStore,
    ) -> Result<TokenSet, RefreshTokenError> {
        let mut state = self.state.lock().await;
        if state.invalidated {
            return Err(RefreshTokenError::LoggedOutDuringRefresh);
        }
        store
            .save(StoredUserSession::new(self.client_id.clone(), tokens.clone()))
            .await?;
        state.tokens = tokens.clone();
        Ok(tokens)
    }

    /// Invalidate this handle and delete the persisted record.
    ///
    /// The flag is flipped before the store removal, so the handle is dead
    /// even if the removal itself fails. Holds the lock only for the flip
    /// and the file removal - never waits on an in-flight refresh's
    /// network call.
    pub(crate) async fn invalidate(&self, store: &SessionStore) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.invalidated = true;
        info!(client_id = %self.client_id, "session invalidated");
        store.remove(&self.client_id).await
    }
}
